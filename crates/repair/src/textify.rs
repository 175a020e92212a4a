//! Tool-call history textification.
//!
//! Some relays execute live tool calls fine but choke on structured
//! tool-call/tool-result pairs in earlier turns. This pass flattens that
//! history into plain text: each invocation becomes a
//! `[Called tool name({...})]` line on its assistant turn, and each matched
//! result becomes a user turn `[Tool name result: ...]` placed right after.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use mender_core::{AssistantMessage, ContentBlock, Message, MessageContent, ToolCallBlock, UserMessage};
use serde_json::{Map, Value};
use tracing::debug;

use crate::plan::Plan;

/// Maximum characters of tool-result text kept in a textified turn.
pub const TOOL_RESULT_TEXT_LIMIT: usize = 800;

/// Appended to result text cut at [`TOOL_RESULT_TEXT_LIMIT`].
pub const TRUNCATION_MARKER: &str = "… (truncated)";

/// Cut `text` to [`TOOL_RESULT_TEXT_LIMIT`] characters, marking the cut.
pub fn truncate_result_text(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(TOOL_RESULT_TEXT_LIMIT) {
        Some((byte, _)) => Cow::Owned(format!("{}{}", &text[..byte], TRUNCATION_MARKER)),
        None => Cow::Borrowed(text),
    }
}

/// Compact JSON for an invocation's arguments, `{}` when absent.
fn format_arguments(arguments: Option<&Value>) -> String {
    match arguments {
        Some(value) => serde_json::to_string(value).unwrap_or_else(|_| "{}".into()),
        None => "{}".into(),
    }
}

fn summary_line(call: &ToolCallBlock) -> String {
    format!(
        "[Called tool {}({})]",
        call.name,
        format_arguments(call.arguments.as_ref())
    )
}

pub fn textify_tool_call_history(messages: &[Message]) -> Cow<'_, [Message]> {
    let has_invocations = messages
        .iter()
        .filter_map(Message::as_assistant)
        .any(AssistantMessage::has_tool_calls);
    if !has_invocations {
        return Cow::Borrowed(messages);
    }

    // First result per correlation id.
    let mut result_index: HashMap<&str, usize> = HashMap::new();
    for (index, message) in messages.iter().enumerate() {
        if let Message::ToolResult(result) = message {
            result_index.entry(result.tool_call_id.as_str()).or_insert(index);
        }
    }

    // Each invocation, in transcript order, claims its result once. Claims
    // are settled up front so a result stored before its turn is still
    // skipped when the scan reaches it.
    let mut consumed: HashSet<usize> = HashSet::new();
    let mut claims: HashMap<usize, Vec<Option<usize>>> = HashMap::new();
    for (index, message) in messages.iter().enumerate() {
        let Some(assistant) = message.as_assistant() else { continue };
        if !assistant.has_tool_calls() {
            continue;
        }
        let claimed = assistant
            .tool_calls()
            .map(|call| {
                result_index
                    .get(call.id.as_str())
                    .copied()
                    .filter(|result| consumed.insert(*result))
            })
            .collect();
        claims.insert(index, claimed);
    }

    let mut plan = Plan::new(messages);
    for (index, message) in messages.iter().enumerate() {
        match message {
            Message::ToolResult(_) if consumed.contains(&index) => {}
            Message::Assistant(assistant) if claims.contains_key(&index) => {
                let mut lines = Vec::new();
                let mut converted = Vec::new();
                for (call, claimed) in assistant.tool_calls().zip(&claims[&index]) {
                    lines.push(summary_line(call));
                    let Some(result) = claimed.and_then(|r| messages[r].as_tool_result()) else {
                        continue;
                    };
                    let name = if result.tool_name.is_empty() {
                        call.name.as_str()
                    } else {
                        result.tool_name.as_str()
                    };
                    let text = result.text();
                    converted.push(Message::User(UserMessage {
                        content: MessageContent::Text(format!(
                            "[Tool {name} result: {}]",
                            truncate_result_text(&text)
                        )),
                        timestamp: result.timestamp,
                        extra: Map::new(),
                    }));
                }

                let mut rebuilt = assistant.clone();
                rebuilt.content.retain(|block| !block.is_tool_call());
                rebuilt.content.push(ContentBlock::text(lines.join("\n")));
                plan.insert(rebuilt.into());
                for message in converted {
                    plan.insert(message);
                }
            }
            _ => plan.keep(index),
        }
    }

    debug!(
        turns = claims.len(),
        results = consumed.len(),
        "Textified tool-call history"
    );
    plan.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_text(message: &Message) -> String {
        match message {
            Message::User(user) => user.content.text(),
            other => panic!("expected user message, got {other:?}"),
        }
    }

    #[test]
    fn textifies_single_round() {
        let messages = vec![
            Message::user("find cats"),
            Message::assistant(vec![ContentBlock::tool_call(
                "call_1",
                "web_search",
                json!({ "query": "cats" }),
            )]),
            Message::tool_result("call_1", "web_search", "Found 10 results about cats"),
            Message::assistant_text("Here are the results."),
        ];
        let out = textify_tool_call_history(&messages);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], messages[0]);

        let assistant = out[1].as_assistant().unwrap();
        assert_eq!(assistant.content.len(), 1);
        assert!(assistant.content[0]
            .as_text()
            .unwrap()
            .contains(r#"[Called tool web_search({"query":"cats"})]"#));

        assert!(user_text(&out[2]).contains("[Tool web_search result: Found 10 results about cats]"));
        assert_eq!(out[3], messages[3]);
    }

    #[test]
    fn textifies_parallel_calls_in_order() {
        let messages = vec![
            Message::assistant(vec![
                ContentBlock::tool_call("call_1", "web_search", json!({ "query": "rust" })),
                ContentBlock::tool_call("call_2", "web_fetch", json!({ "url": "https://www.rust-lang.org" })),
            ]),
            Message::tool_result("call_1", "web_search", "search results"),
            Message::tool_result("call_2", "web_fetch", "page body"),
        ];
        let out = textify_tool_call_history(&messages);
        assert_eq!(out.len(), 3);

        let summary = out[0].as_assistant().unwrap().content[0].as_text().unwrap().to_string();
        assert!(summary.contains("web_search"));
        assert!(summary.contains("web_fetch"));
        assert!(user_text(&out[1]).starts_with("[Tool web_search result:"));
        assert!(user_text(&out[2]).starts_with("[Tool web_fetch result:"));
    }

    #[test]
    fn unmatched_invocation_yields_only_summary() {
        let messages = vec![Message::assistant(vec![ContentBlock::tool_call(
            "call_1",
            "exec",
            json!({ "cmd": "ls" }),
        )])];
        let out = textify_tool_call_history(&messages);
        assert_eq!(out.len(), 1);
        assert!(!out[0].as_assistant().unwrap().has_tool_calls());
    }

    #[test]
    fn keeps_non_invocation_blocks_before_summary() {
        let thinking = ContentBlock::Other(json!({ "type": "thinking", "thinking": "plan" }));
        let messages = vec![Message::assistant(vec![
            thinking.clone(),
            ContentBlock::text("Checking."),
            ContentBlock::tool_call("c", "read", json!({})),
        ])];
        let out = textify_tool_call_history(&messages);
        let content = &out[0].as_assistant().unwrap().content;
        assert_eq!(content.len(), 3);
        assert_eq!(content[0], thinking);
        assert_eq!(content[1].as_text(), Some("Checking."));
        assert_eq!(content[2].as_text(), Some("[Called tool read({})]"));
    }

    #[test]
    fn missing_arguments_render_as_empty_object() {
        let mut call = ToolCallBlock::new("c", "noop", json!({}));
        call.arguments = None;
        assert_eq!(summary_line(&call), "[Called tool noop({})]");
    }

    #[test]
    fn string_arguments_render_as_json_strings() {
        let call = ToolCallBlock::new("c", "read", json!("{\"path\":\"a.txt\"}"));
        assert_eq!(summary_line(&call), r#"[Called tool read("{\"path\":\"a.txt\"}")]"#);

        let call = ToolCallBlock::new("c", "echo", json!("plain"));
        assert_eq!(summary_line(&call), r#"[Called tool echo("plain")]"#);
    }

    #[test]
    fn result_stored_before_its_turn_is_not_duplicated() {
        let messages = vec![
            Message::tool_result("call_1", "read", "early"),
            Message::assistant(vec![ContentBlock::tool_call("call_1", "read", json!({}))]),
        ];
        let out = textify_tool_call_history(&messages);
        assert_eq!(out.len(), 2);
        assert!(out[0].is_assistant());
        assert_eq!(user_text(&out[1]), "[Tool read result: early]");
    }

    #[test]
    fn unmatched_tool_results_pass_through() {
        let messages = vec![
            Message::assistant(vec![ContentBlock::tool_call("call_1", "read", json!({}))]),
            Message::tool_result("stray", "read", "nobody asked"),
        ];
        let out = textify_tool_call_history(&messages);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], messages[1]);
    }

    #[test]
    fn no_invocations_returns_input() {
        let messages = vec![Message::user("hi"), Message::assistant_text("hello")];
        let out = textify_tool_call_history(&messages);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert!(std::ptr::eq(out.as_ptr(), messages.as_ptr()));
    }

    #[test]
    fn truncation_is_exact() {
        let exact = "x".repeat(TOOL_RESULT_TEXT_LIMIT);
        assert_eq!(truncate_result_text(&exact), exact.as_str());

        let long = "é".repeat(TOOL_RESULT_TEXT_LIMIT + 5);
        let cut = truncate_result_text(&long);
        assert_eq!(
            cut,
            format!("{}{}", "é".repeat(TOOL_RESULT_TEXT_LIMIT), TRUNCATION_MARKER)
        );
    }

    #[test]
    fn long_results_are_truncated_in_turn() {
        let body = "a".repeat(1000);
        let messages = vec![
            Message::assistant(vec![ContentBlock::tool_call("c", "read", json!({}))]),
            Message::tool_result("c", "read", body),
        ];
        let out = textify_tool_call_history(&messages);
        let expected = format!("[Tool read result: {}… (truncated)]", "a".repeat(800));
        assert_eq!(user_text(&out[1]), expected);
    }

    #[test]
    fn textify_is_idempotent() {
        let messages = vec![
            Message::assistant(vec![ContentBlock::tool_call("c", "read", json!({}))]),
            Message::tool_result("c", "read", "ok"),
        ];
        let once = textify_tool_call_history(&messages).into_owned();
        let twice = textify_tool_call_history(&once);
        assert!(matches!(twice, Cow::Borrowed(_)));
    }
}
