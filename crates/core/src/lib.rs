//! # Mender Core
//!
//! Message model, policy types, and error definitions shared by every
//! transcript repair stage. This crate holds no repair logic — it defines
//! the vocabulary the other crates read and write.

pub mod error;
pub mod message;
pub mod policy;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result, TranscriptError};
pub use message::{
    parse_transcript, ArgumentsKey, AssistantMessage, ContentBlock, Message, MessageContent, Role,
    StopReason, ToolCallBlock, ToolCallKind, ToolResultMessage, UserMessage,
};
pub use policy::{PolicyOverrides, TranscriptPolicy};
