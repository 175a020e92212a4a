//! Pipeline driver — runs the repair stages a policy asks for, in order,
//! right before a transcript is handed to a model API client.
//!
//! Order: sanitize → pairing repair → split → textify. Sanitizing always
//! runs; it is a no-op on well-formed transcripts.

use std::borrow::Cow;

use mender_core::{Message, PolicyOverrides, TranscriptPolicy};
use serde::Serialize;
use tracing::{debug, info};

use crate::pairing::repair_tool_use_result_pairing;
use crate::policy::resolve_transcript_policy;
use crate::sanitize::sanitize_tool_call_inputs;
use crate::split::split_parallel_tool_calls;
use crate::textify::textify_tool_call_history;

/// Aggregated audit counts from every stage that ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub dropped_tool_calls: usize,
    pub dropped_assistant_messages: usize,
    pub synthetic_results_added: usize,
    pub dropped_duplicate_count: usize,
    pub dropped_orphan_count: usize,
    pub moved: bool,
    pub split_messages: usize,
    pub textified: bool,
}

impl PipelineReport {
    /// True when no stage changed anything.
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// A transcript ready to send, plus how it got that way.
#[derive(Debug, Clone)]
pub struct PreparedTranscript<'a> {
    pub messages: Cow<'a, [Message]>,
    pub policy: TranscriptPolicy,
    pub report: PipelineReport,
}

impl PreparedTranscript<'_> {
    /// True when the output is the caller's own slice.
    pub fn is_unchanged(&self) -> bool {
        matches!(self.messages, Cow::Borrowed(_))
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages.into_owned()
    }
}

fn changed(messages: Cow<'_, [Message]>) -> Option<Vec<Message>> {
    match messages {
        Cow::Borrowed(_) => None,
        Cow::Owned(messages) => Some(messages),
    }
}

/// Run every stage `policy` enables over `messages`.
pub fn prepare_transcript<'a>(messages: &'a [Message], policy: &TranscriptPolicy) -> PreparedTranscript<'a> {
    let mut current: Cow<'a, [Message]> = Cow::Borrowed(messages);
    let mut report = PipelineReport::default();

    let next = {
        let sanitized = sanitize_tool_call_inputs(&current);
        report.dropped_tool_calls = sanitized.dropped_tool_calls;
        report.dropped_assistant_messages = sanitized.dropped_assistant_messages;
        changed(sanitized.messages)
    };
    if let Some(next) = next {
        current = Cow::Owned(next);
    }

    if policy.repair_tool_use_result_pairing {
        let next = {
            let paired = repair_tool_use_result_pairing(&current);
            report.synthetic_results_added = paired.added.len();
            report.dropped_duplicate_count = paired.dropped_duplicate_count;
            report.dropped_orphan_count = paired.dropped_orphan_count;
            report.moved = paired.moved;
            changed(paired.messages)
        };
        if let Some(next) = next {
            current = Cow::Owned(next);
        }
    }

    if policy.split_parallel_tool_calls {
        let next = {
            let split = split_parallel_tool_calls(&current);
            report.split_messages = split.split_messages;
            changed(split.messages)
        };
        if let Some(next) = next {
            current = Cow::Owned(next);
        }
    }

    if policy.textify_tool_call_history {
        let next = changed(textify_tool_call_history(&current));
        if let Some(next) = next {
            report.textified = true;
            current = Cow::Owned(next);
        }
    }

    if report.is_clean() {
        debug!(messages = current.len(), "Transcript needed no repair");
    } else {
        info!(
            dropped_tool_calls = report.dropped_tool_calls,
            dropped_assistant_messages = report.dropped_assistant_messages,
            synthetic = report.synthetic_results_added,
            duplicates = report.dropped_duplicate_count,
            orphans = report.dropped_orphan_count,
            moved = report.moved,
            split = report.split_messages,
            textified = report.textified,
            "Transcript repair applied fixes"
        );
    }

    PreparedTranscript {
        messages: current,
        policy: *policy,
        report,
    }
}

/// Policy resolution plus operator overrides, bundled for callers that
/// prepare many transcripts under the same configuration.
#[derive(Debug, Clone, Default)]
pub struct TranscriptPreparer {
    overrides: PolicyOverrides,
}

impl TranscriptPreparer {
    pub fn new(overrides: PolicyOverrides) -> Self {
        Self { overrides }
    }

    pub fn overrides(&self) -> &PolicyOverrides {
        &self.overrides
    }

    /// Resolve the policy for a request and apply the configured overrides.
    pub fn policy_for(&self, model_api: &str, provider: &str, model_id: &str) -> TranscriptPolicy {
        resolve_transcript_policy(model_api, provider, model_id).with_overrides(&self.overrides)
    }

    pub fn prepare<'a>(
        &self,
        messages: &'a [Message],
        model_api: &str,
        provider: &str,
        model_id: &str,
    ) -> PreparedTranscript<'a> {
        let policy = self.policy_for(model_api, provider, model_id);
        prepare_transcript(messages, &policy)
    }
}
