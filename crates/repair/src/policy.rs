//! Policy resolution — which repairs a given API/provider/model needs.
//!
//! Pure and total: unknown combinations fall back to
//! [`TranscriptPolicy::CONSERVATIVE`].

use mender_core::TranscriptPolicy;

/// Providers that talk to Google's Generative AI API directly.
const GOOGLE_NATIVE_PROVIDERS: &[&str] = &[
    "google",
    "google-generative-ai",
    "google-vertex",
    "google-gemini-cli",
    "google-antigravity",
];

/// Model APIs that speak Google's native protocol.
const GOOGLE_NATIVE_APIS: &[&str] = &["google-generative-ai", "google-gemini-cli", "google-vertex"];

/// GitHub Copilot's proxied endpoints.
const COPILOT_PROVIDERS: &[&str] = &["github-copilot", "copilot"];

/// Relays that already special-case Gemini on their side.
const AGGREGATOR_PROVIDERS: &[&str] = &["openrouter", "opencode"];

/// Coarse classification of a provider id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFamily {
    GoogleNative,
    CopilotProxy,
    Aggregator,
    Other,
}

impl ProviderFamily {
    /// Classify a provider id, ignoring case and surrounding whitespace.
    pub fn classify(provider: &str) -> Self {
        let provider = provider.trim().to_ascii_lowercase();
        let provider = provider.as_str();
        if GOOGLE_NATIVE_PROVIDERS.contains(&provider) {
            Self::GoogleNative
        } else if COPILOT_PROVIDERS.contains(&provider) {
            Self::CopilotProxy
        } else if AGGREGATOR_PROVIDERS.contains(&provider) {
            Self::Aggregator
        } else {
            Self::Other
        }
    }
}

/// Whether a model id names a Gemini model (`gemini-2.5-pro`, `google/gemini-3-flash`, …).
pub fn is_gemini_model(model_id: &str) -> bool {
    let model_id = model_id.trim().to_ascii_lowercase();
    model_id
        .rsplit('/')
        .next()
        .is_some_and(|name| name.contains("gemini"))
}

fn is_google_native_api(model_api: &str) -> bool {
    GOOGLE_NATIVE_APIS.contains(&model_api.trim().to_ascii_lowercase().as_str())
}

/// Decide which transcript repairs apply to a request.
///
/// Rules, first match wins:
/// 1. Google-native providers enforce strict pairing but understand
///    structured tool calls: pairing repair only.
/// 2. Copilot relaying a Gemini model rejects native tool-call history:
///    everything on.
/// 3. Aggregators repair Gemini transcripts themselves: nothing.
/// 4. An unrecognized provider speaking a Google-native API is treated as rule 1.
/// 5. Otherwise nothing.
pub fn resolve_transcript_policy(model_api: &str, provider: &str, model_id: &str) -> TranscriptPolicy {
    match ProviderFamily::classify(provider) {
        ProviderFamily::GoogleNative => TranscriptPolicy {
            repair_tool_use_result_pairing: true,
            ..TranscriptPolicy::CONSERVATIVE
        },
        ProviderFamily::CopilotProxy if is_gemini_model(model_id) => TranscriptPolicy {
            textify_tool_call_history: true,
            repair_tool_use_result_pairing: true,
            allow_synthetic_tool_results: true,
            split_parallel_tool_calls: true,
        },
        ProviderFamily::Aggregator => TranscriptPolicy::CONSERVATIVE,
        ProviderFamily::Other if is_google_native_api(model_api) => TranscriptPolicy {
            repair_tool_use_result_pairing: true,
            ..TranscriptPolicy::CONSERVATIVE
        },
        _ => TranscriptPolicy::CONSERVATIVE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_native_repairs_pairing_only() {
        let policy = resolve_transcript_policy("google-generative-ai", "google", "gemini-2.5-pro");
        assert!(policy.repair_tool_use_result_pairing);
        assert!(!policy.textify_tool_call_history);
        assert!(!policy.allow_synthetic_tool_results);
        assert!(!policy.split_parallel_tool_calls);
    }

    #[test]
    fn google_native_applies_regardless_of_model() {
        let policy = resolve_transcript_policy("google-generative-ai", "google", "some-other-model");
        assert!(policy.repair_tool_use_result_pairing);
    }

    #[test]
    fn copilot_gemini_enables_everything() {
        let policy = resolve_transcript_policy("openai-completions", "github-copilot", "gemini-3-pro-preview");
        assert!(policy.textify_tool_call_history);
        assert!(policy.repair_tool_use_result_pairing);
        assert!(policy.allow_synthetic_tool_results);
        assert!(policy.split_parallel_tool_calls);
    }

    #[test]
    fn copilot_non_gemini_is_conservative() {
        let policy = resolve_transcript_policy("openai-completions", "github-copilot", "gpt-4o");
        assert_eq!(policy, TranscriptPolicy::CONSERVATIVE);
    }

    #[test]
    fn aggregator_never_double_repairs() {
        let policy = resolve_transcript_policy("openai-completions", "openrouter", "google/gemini-2.5-pro");
        assert_eq!(policy, TranscriptPolicy::CONSERVATIVE);

        let policy = resolve_transcript_policy("google-generative-ai", "OpenRouter", "gemini-2.5-pro");
        assert_eq!(policy, TranscriptPolicy::CONSERVATIVE);
    }

    #[test]
    fn unknown_provider_on_google_api_repairs_pairing() {
        let policy = resolve_transcript_policy("google-generative-ai", "my-gateway", "gemini-2.5-flash");
        assert!(policy.repair_tool_use_result_pairing);
        assert!(!policy.textify_tool_call_history);
    }

    #[test]
    fn unknown_combination_is_conservative() {
        let policy = resolve_transcript_policy("anthropic-messages", "anthropic", "claude-sonnet-4");
        assert_eq!(policy, TranscriptPolicy::CONSERVATIVE);
        assert_eq!(resolve_transcript_policy("", "", ""), TranscriptPolicy::CONSERVATIVE);
    }

    #[test]
    fn provider_classification_ignores_case() {
        assert_eq!(ProviderFamily::classify(" Google "), ProviderFamily::GoogleNative);
        assert_eq!(ProviderFamily::classify("GitHub-Copilot"), ProviderFamily::CopilotProxy);
        assert_eq!(ProviderFamily::classify("ollama"), ProviderFamily::Other);
    }

    #[test]
    fn gemini_pattern_matches_model_name() {
        assert!(is_gemini_model("gemini-2.5-pro"));
        assert!(is_gemini_model("google/Gemini-3-Flash"));
        assert!(!is_gemini_model("gemini-proxy/gpt-4o"));
        assert!(!is_gemini_model("claude-sonnet-4"));
    }
}
