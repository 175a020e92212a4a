//! Transcript policy — the set of repair switches chosen per provider.

use serde::{Deserialize, Serialize};

/// Which repairs to apply to a transcript before it is sent to a model API.
///
/// Field names serialize in the camelCase shape provider clients expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptPolicy {
    /// Flatten structured tool-call history into plain text turns
    pub textify_tool_call_history: bool,

    /// Restore strict invocation → result adjacency and uniqueness
    pub repair_tool_use_result_pairing: bool,

    /// Permit placeholder error results for invocations that never got one
    pub allow_synthetic_tool_results: bool,

    /// One invocation per assistant turn
    pub split_parallel_tool_calls: bool,
}

impl TranscriptPolicy {
    /// Every switch off.
    pub const CONSERVATIVE: Self = Self {
        textify_tool_call_history: false,
        repair_tool_use_result_pairing: false,
        allow_synthetic_tool_results: false,
        split_parallel_tool_calls: false,
    };

    /// Apply explicit overrides on top of a resolved policy.
    pub fn with_overrides(self, overrides: &PolicyOverrides) -> Self {
        Self {
            textify_tool_call_history: overrides
                .textify_tool_call_history
                .unwrap_or(self.textify_tool_call_history),
            repair_tool_use_result_pairing: overrides
                .repair_tool_use_result_pairing
                .unwrap_or(self.repair_tool_use_result_pairing),
            allow_synthetic_tool_results: overrides
                .allow_synthetic_tool_results
                .unwrap_or(self.allow_synthetic_tool_results),
            split_parallel_tool_calls: overrides
                .split_parallel_tool_calls
                .unwrap_or(self.split_parallel_tool_calls),
        }
    }

    /// True if any switch is on.
    pub fn is_active(&self) -> bool {
        self.textify_tool_call_history
            || self.repair_tool_use_result_pairing
            || self.allow_synthetic_tool_results
            || self.split_parallel_tool_calls
    }
}

/// Operator-supplied overrides; `None` keeps whatever the resolver decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicyOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub textify_tool_call_history: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repair_tool_use_result_pairing: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_synthetic_tool_results: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_parallel_tool_calls: Option<bool>,
}

impl PolicyOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_conservative() {
        assert_eq!(TranscriptPolicy::default(), TranscriptPolicy::CONSERVATIVE);
        assert!(!TranscriptPolicy::default().is_active());
    }

    #[test]
    fn overrides_replace_only_set_fields() {
        let resolved = TranscriptPolicy {
            repair_tool_use_result_pairing: true,
            ..TranscriptPolicy::CONSERVATIVE
        };
        let overrides = PolicyOverrides {
            textify_tool_call_history: Some(true),
            repair_tool_use_result_pairing: Some(false),
            ..PolicyOverrides::default()
        };
        let policy = resolved.with_overrides(&overrides);
        assert!(policy.textify_tool_call_history);
        assert!(!policy.repair_tool_use_result_pairing);
        assert!(!policy.allow_synthetic_tool_results);
    }

    #[test]
    fn policy_serializes_camel_case() {
        let json = serde_json::to_value(TranscriptPolicy::CONSERVATIVE).unwrap();
        assert_eq!(json["textifyToolCallHistory"], false);
        assert_eq!(json["repairToolUseResultPairing"], false);
        assert_eq!(json["allowSyntheticToolResults"], false);
        assert_eq!(json["splitParallelToolCalls"], false);
    }
}
