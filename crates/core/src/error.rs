//! Error types for the Mender domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! The repair transforms themselves never fail; these errors only surface at
//! the edges (parsing a transcript, loading config, reading files).

use thiserror::Error;

/// The top-level error type for all Mender operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Transcript boundary errors ---
    #[error("Transcript error: {0}")]
    Transcript(#[from] TranscriptError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- I/O ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while turning raw JSON into the message model.
#[derive(Debug, Clone, Error)]
pub enum TranscriptError {
    #[error("Content block must be a JSON object, got {found}")]
    InvalidBlock { found: String },

    #[error("Transcript must be a JSON array of messages or an object with a `messages` array: {0}")]
    InvalidTranscript(String),
}
