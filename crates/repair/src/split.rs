//! Parallel tool-call splitting.
//!
//! Some relays only accept one invocation per assistant turn. An assistant
//! turn with several invocations whose results directly follow it is
//! rewritten into one turn per invocation, each trailed by its own result.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use mender_core::{AssistantMessage, ContentBlock, Message, ToolCallBlock};
use tracing::debug;

use crate::plan::Plan;

/// Result of [`split_parallel_tool_calls`].
#[derive(Debug, Clone)]
pub struct SplitReport<'a> {
    pub messages: Cow<'a, [Message]>,
    /// Number of assistant turns that were split
    pub split_messages: usize,
}

pub fn split_parallel_tool_calls(messages: &[Message]) -> SplitReport<'_> {
    let mut plan = Plan::new(messages);
    let mut split_messages = 0usize;

    let mut i = 0usize;
    while i < messages.len() {
        let Message::Assistant(assistant) = &messages[i] else {
            plan.keep(i);
            i += 1;
            continue;
        };

        let calls: Vec<&ToolCallBlock> = assistant.tool_calls().collect();
        if assistant.is_incomplete() || calls.len() < 2 {
            plan.keep(i);
            i += 1;
            continue;
        }

        // Contiguous run of results right after the turn; first per id wins.
        let mut run: HashMap<&str, usize> = HashMap::new();
        let mut end = i + 1;
        while let Some(Message::ToolResult(result)) = messages.get(end) {
            run.entry(result.tool_call_id.as_str()).or_insert(end);
            end += 1;
        }

        let mut ids = HashSet::new();
        let splittable = calls
            .iter()
            .all(|call| ids.insert(call.id.as_str()) && run.contains_key(call.id.as_str()));
        if !splittable {
            plan.keep(i);
            i += 1;
            continue;
        }

        let mut leading: Vec<ContentBlock> = assistant
            .content
            .iter()
            .filter(|block| !block.is_tool_call())
            .cloned()
            .collect();
        let mut used = HashSet::new();
        for call in &calls {
            let mut content = std::mem::take(&mut leading);
            content.push(ContentBlock::ToolCall((*call).clone()));
            plan.insert(single_call_turn(assistant, content).into());

            let index = run[call.id.as_str()];
            plan.keep(index);
            used.insert(index);
        }
        for index in (i + 1)..end {
            if !used.contains(&index) {
                plan.keep(index);
            }
        }

        debug!(index = i, calls = calls.len(), "Split parallel tool calls");
        split_messages += 1;
        i = end;
    }

    SplitReport {
        messages: plan.finish(),
        split_messages,
    }
}

fn single_call_turn(source: &AssistantMessage, content: Vec<ContentBlock>) -> AssistantMessage {
    AssistantMessage {
        content,
        stop_reason: source.stop_reason.clone(),
        api: source.api.clone(),
        provider: source.provider.clone(),
        model: source.model.clone(),
        timestamp: source.timestamp,
        extra: source.extra.clone(),
    }
}
