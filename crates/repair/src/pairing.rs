//! Tool-use / tool-result pairing repair.
//!
//! Several provider protocols reject a request when an assistant tool
//! invocation is not immediately followed by exactly one matching result,
//! or when a result id appears twice anywhere in history. This pass
//! restores both invariants in a single left-to-right scan:
//!
//! - results that drifted behind other messages are moved back next to
//!   their invocation, and whatever sat in between is re-emitted after them
//! - invocations with no result get a synthetic error result
//! - duplicate and orphaned results are dropped
//!
//! Assistant turns that ended in an error or were aborted are left alone;
//! the provider may never have registered their invocations.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use mender_core::{AssistantMessage, ContentBlock, Message, MessageContent, ToolResultMessage};
use tracing::{debug, warn};

use crate::plan::Plan;

/// Text carried by every synthetic tool result.
pub const SYNTHETIC_TOOL_RESULT_TEXT: &str =
    "[mender] missing tool result in session history; inserted synthetic error result for transcript repair.";

/// Build the placeholder result inserted for an invocation that has none.
pub fn synthetic_tool_result(tool_call_id: &str, tool_name: &str) -> ToolResultMessage {
    ToolResultMessage::new(
        tool_call_id,
        tool_name,
        MessageContent::Blocks(vec![ContentBlock::text(SYNTHETIC_TOOL_RESULT_TEXT)]),
        true,
    )
}

/// Result of [`repair_tool_use_result_pairing`].
#[derive(Debug, Clone)]
pub struct PairingReport<'a> {
    pub messages: Cow<'a, [Message]>,
    /// Synthetic results inserted, in emission order
    pub added: Vec<ToolResultMessage>,
    pub dropped_duplicate_count: usize,
    pub dropped_orphan_count: usize,
    /// A real result was relocated past intervening messages.
    ///
    /// Set only when a kept result sat after some non-result message of its
    /// span. A span whose results already come first and whose other
    /// messages merely follow them is left as is, so `moved` stays false and
    /// the output stays borrowed.
    pub moved: bool,
}

/// Ordered, de-duplicated `(id, name)` pairs of an assistant's invocations.
fn invocations(assistant: &AssistantMessage) -> Vec<(&str, &str)> {
    let mut seen = HashSet::new();
    assistant
        .tool_calls()
        .filter(|call| !call.id.is_empty() && seen.insert(call.id.as_str()))
        .map(|call| (call.id.as_str(), call.name.as_str()))
        .collect()
}

pub fn repair_tool_use_result_pairing(messages: &[Message]) -> PairingReport<'_> {
    let mut plan = Plan::new(messages);
    let mut seen: HashSet<&str> = HashSet::new();
    let mut added: Vec<ToolResultMessage> = Vec::new();
    let mut dropped_duplicate_count = 0usize;
    let mut dropped_orphan_count = 0usize;
    let mut moved = false;

    let mut i = 0usize;
    while i < messages.len() {
        let assistant = match &messages[i] {
            Message::Assistant(assistant) => assistant,
            Message::ToolResult(result) => {
                debug!(tool_call_id = %result.tool_call_id, "Dropping orphaned tool result");
                dropped_orphan_count += 1;
                i += 1;
                continue;
            }
            Message::User(_) | Message::Other(_) => {
                plan.keep(i);
                i += 1;
                continue;
            }
        };

        if assistant.is_incomplete() {
            plan.keep(i);
            i += 1;
            continue;
        }

        let calls = invocations(assistant);
        if calls.is_empty() {
            plan.keep(i);
            i += 1;
            continue;
        }

        // Span: everything up to the next assistant turn.
        let mut span_results: HashMap<&str, usize> = HashMap::new();
        let mut remainder: Vec<usize> = Vec::new();
        let mut j = i + 1;
        while j < messages.len() && !messages[j].is_assistant() {
            match &messages[j] {
                Message::ToolResult(result) => {
                    let id = result.tool_call_id.as_str();
                    if !calls.iter().any(|(call_id, _)| *call_id == id) {
                        debug!(tool_call_id = %id, "Dropping tool result for another turn");
                        dropped_orphan_count += 1;
                    } else if span_results.contains_key(id) {
                        dropped_duplicate_count += 1;
                    } else {
                        span_results.insert(id, j);
                    }
                }
                _ => remainder.push(j),
            }
            j += 1;
        }

        plan.keep(i);
        let mut last_result: Option<usize> = None;
        for &(id, name) in &calls {
            match span_results.get(id) {
                Some(_) if seen.contains(id) => dropped_duplicate_count += 1,
                Some(&index) => {
                    plan.keep(index);
                    last_result = Some(last_result.map_or(index, |last| last.max(index)));
                }
                // A second synthetic result would collide with the first.
                None if seen.contains(id) => {}
                None => {
                    let synthetic = synthetic_tool_result(id, name);
                    added.push(synthetic.clone());
                    plan.insert(synthetic.into());
                }
            }
            seen.insert(id);
        }

        if let (Some(last), Some(&first)) = (last_result, remainder.first()) {
            if first < last {
                moved = true;
            }
        }
        for index in remainder {
            plan.keep(index);
        }

        i = j;
    }

    let messages = plan.finish();
    if matches!(messages, Cow::Owned(_)) {
        warn!(
            added = added.len(),
            duplicates = dropped_duplicate_count,
            orphans = dropped_orphan_count,
            moved,
            "Repaired tool-use/tool-result pairing"
        );
    }

    PairingReport {
        messages,
        added,
        dropped_duplicate_count,
        dropped_orphan_count,
        moved,
    }
}
