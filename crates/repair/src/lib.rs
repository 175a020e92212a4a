//! Transcript repair stages for Mender.
//!
//! Every stage is a pure function over `&[Message]` that returns
//! `Cow::Borrowed` of its input when it had nothing to do, so callers can
//! skip downstream work cheaply. The [`pipeline`] module strings them
//! together according to a [`TranscriptPolicy`](mender_core::TranscriptPolicy).

pub mod guard;
pub mod pairing;
pub mod pipeline;
mod plan;
pub mod policy;
pub mod sanitize;
pub mod split;
pub mod textify;

pub use guard::ToolResultGuard;
pub use pairing::{repair_tool_use_result_pairing, synthetic_tool_result, PairingReport, SYNTHETIC_TOOL_RESULT_TEXT};
pub use pipeline::{prepare_transcript, PipelineReport, PreparedTranscript, TranscriptPreparer};
pub use policy::{is_gemini_model, resolve_transcript_policy, ProviderFamily};
pub use sanitize::{sanitize_tool_call_inputs, SanitizeReport};
pub use split::{split_parallel_tool_calls, SplitReport};
pub use textify::{textify_tool_call_history, truncate_result_text, TOOL_RESULT_TEXT_LIMIT, TRUNCATION_MARKER};
