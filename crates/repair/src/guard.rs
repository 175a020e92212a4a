//! Tool-result guard for transcripts that are still being written.
//!
//! Catches missing results at append time: when a new user or assistant
//! turn arrives while invocations are still waiting for results, the guard
//! settles them first so the stored transcript never carries an open round.

use mender_core::{Message, TranscriptPolicy};
use tracing::warn;

use crate::pairing::synthetic_tool_result;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pending {
    id: String,
    name: String,
}

/// Append-only transcript writer that tracks open tool invocations.
#[derive(Debug, Clone, Default)]
pub struct ToolResultGuard {
    messages: Vec<Message>,
    pending: Vec<Pending>,
    allow_synthetic: bool,
    synthesized: usize,
}

impl ToolResultGuard {
    pub fn new(policy: &TranscriptPolicy) -> Self {
        Self {
            allow_synthetic: policy.allow_synthetic_tool_results,
            ..Self::default()
        }
    }

    /// Resume guarding an existing transcript. Open invocations at its tail
    /// are picked up as pending.
    pub fn with_messages(policy: &TranscriptPolicy, messages: Vec<Message>) -> Self {
        let mut guard = Self::new(policy);
        for message in &messages {
            guard.track(message);
        }
        guard.messages = messages;
        guard
    }

    fn track(&mut self, message: &Message) {
        match message {
            Message::Assistant(assistant) => {
                self.pending.clear();
                if !assistant.is_incomplete() {
                    self.pending.extend(assistant.tool_calls().filter(|c| c.is_valid()).map(|call| Pending {
                        id: call.id.clone(),
                        name: call.name.clone(),
                    }));
                }
            }
            Message::ToolResult(result) => {
                self.pending.retain(|p| p.id != result.tool_call_id);
            }
            Message::User(_) | Message::Other(_) => self.pending.clear(),
        }
    }

    /// Append a message, settling open invocations first when it starts a
    /// new turn.
    pub fn append(&mut self, message: Message) {
        if !matches!(message, Message::ToolResult(_)) {
            self.flush_pending();
        }
        self.track(&message);
        self.messages.push(message);
    }

    /// Settle every open invocation. Returns how many synthetic results were
    /// appended (zero when synthetic results are not allowed; the open ids
    /// are then left for the pairing repair pass).
    pub fn flush_pending(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }

        let pending = std::mem::take(&mut self.pending);
        if !self.allow_synthetic {
            warn!(
                open = pending.len(),
                "Tool calls left without results; synthetic results not allowed"
            );
            return 0;
        }

        let count = pending.len();
        for Pending { id, name } in pending {
            self.messages.push(synthetic_tool_result(&id, &name).into());
        }
        self.synthesized += count;
        warn!(count, "Inserted synthetic tool results for open tool calls");
        count
    }

    /// Ids still waiting for a result, in invocation order.
    pub fn pending_ids(&self) -> Vec<&str> {
        self.pending.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Total synthetic results appended over the guard's lifetime.
    pub fn synthesized_count(&self) -> usize {
        self.synthesized
    }
}
