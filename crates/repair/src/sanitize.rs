//! Tool-call input sanitizing.
//!
//! Drops tool invocations that could never have been executed: no
//! correlation id, or no arguments payload at all. Assistant messages left
//! with no content are dropped with them.

use std::borrow::Cow;

use mender_core::{ContentBlock, Message};
use tracing::{debug, warn};

use crate::plan::Plan;

/// Result of [`sanitize_tool_call_inputs`].
#[derive(Debug, Clone)]
pub struct SanitizeReport<'a> {
    pub messages: Cow<'a, [Message]>,
    pub dropped_tool_calls: usize,
    pub dropped_assistant_messages: usize,
}

pub fn sanitize_tool_call_inputs(messages: &[Message]) -> SanitizeReport<'_> {
    let mut plan = Plan::new(messages);
    let mut dropped_tool_calls = 0usize;
    let mut dropped_assistant_messages = 0usize;

    for (index, message) in messages.iter().enumerate() {
        let Message::Assistant(assistant) = message else {
            plan.keep(index);
            continue;
        };

        let invalid = assistant.tool_calls().filter(|call| !call.is_valid()).count();
        if invalid == 0 {
            plan.keep(index);
            continue;
        }
        dropped_tool_calls += invalid;

        let content: Vec<ContentBlock> = assistant
            .content
            .iter()
            .filter(|block| !matches!(block, ContentBlock::ToolCall(call) if !call.is_valid()))
            .cloned()
            .collect();

        if content.is_empty() {
            debug!(index, "Dropped assistant message left empty by tool-call sanitizing");
            dropped_assistant_messages += 1;
            continue;
        }

        let mut rebuilt = assistant.clone();
        rebuilt.content = content;
        plan.insert(rebuilt.into());
    }

    if dropped_tool_calls > 0 {
        warn!(
            dropped_tool_calls,
            dropped_assistant_messages, "Dropped tool calls with missing id or input"
        );
    }

    SanitizeReport {
        messages: plan.finish(),
        dropped_tool_calls,
        dropped_assistant_messages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mender_core::ToolCallBlock;
    use serde_json::json;

    fn call_without_input(id: &str) -> ContentBlock {
        let mut call = ToolCallBlock::new(id, "read", json!({}));
        call.arguments = None;
        ContentBlock::ToolCall(call)
    }

    #[test]
    fn valid_history_is_returned_by_reference() {
        let messages = vec![
            Message::user("read a.txt"),
            Message::assistant(vec![ContentBlock::tool_call("call_1", "read", json!({ "path": "a.txt" }))]),
            Message::tool_result("call_1", "read", "contents"),
        ];
        let report = sanitize_tool_call_inputs(&messages);
        assert!(matches!(report.messages, Cow::Borrowed(_)));
        assert!(std::ptr::eq(report.messages.as_ptr(), messages.as_ptr()));
        assert_eq!(report.dropped_tool_calls, 0);
        assert_eq!(report.dropped_assistant_messages, 0);
    }

    #[test]
    fn drops_tool_call_without_input_keeps_text() {
        let messages = vec![Message::assistant(vec![
            ContentBlock::text("Let me look."),
            call_without_input("call_1"),
            ContentBlock::tool_call("call_2", "read", json!({ "path": "b.txt" })),
        ])];
        let report = sanitize_tool_call_inputs(&messages);
        assert_eq!(report.dropped_tool_calls, 1);
        assert_eq!(report.dropped_assistant_messages, 0);

        let assistant = report.messages[0].as_assistant().unwrap();
        assert_eq!(assistant.content.len(), 2);
        let ids: Vec<&str> = assistant.tool_calls().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["call_2"]);
    }

    #[test]
    fn drops_assistant_left_empty() {
        let messages = vec![
            Message::user("hi"),
            Message::assistant(vec![call_without_input("call_1")]),
            Message::user("again"),
        ];
        let report = sanitize_tool_call_inputs(&messages);
        assert_eq!(report.dropped_tool_calls, 1);
        assert_eq!(report.dropped_assistant_messages, 1);
        assert_eq!(report.messages.len(), 2);
        assert!(report.messages.iter().all(|m| !m.is_assistant()));
    }

    #[test]
    fn drops_tool_call_with_blank_id() {
        let messages = vec![Message::assistant(vec![
            ContentBlock::text("x"),
            ContentBlock::tool_call("  ", "read", json!({})),
        ])];
        let report = sanitize_tool_call_inputs(&messages);
        assert_eq!(report.dropped_tool_calls, 1);
        assert!(!report.messages[0].as_assistant().unwrap().has_tool_calls());
    }

    #[test]
    fn sanitizing_is_idempotent() {
        let messages = vec![
            Message::assistant(vec![ContentBlock::text("a"), call_without_input("c1")]),
            Message::assistant(vec![call_without_input("c2")]),
        ];
        let once = sanitize_tool_call_inputs(&messages).messages.into_owned();
        let twice = sanitize_tool_call_inputs(&once);
        assert!(matches!(twice.messages, Cow::Borrowed(_)));
        assert_eq!(twice.messages.as_ref(), once.as_slice());
    }
}
