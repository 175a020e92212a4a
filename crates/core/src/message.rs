//! Message and content-block domain types.
//!
//! These are the value objects every repair stage reads and writes:
//! upstream code produces a transcript → the repair pipeline rewrites it →
//! a provider client serializes it onto the wire.
//!
//! Provider dialects spell tool invocations differently (`toolCall`,
//! `toolUse`, `functionCall`) and carry arguments under either `input` or
//! `arguments`. All of that is normalized here, at the serde boundary, so
//! the repair logic only ever sees [`ContentBlock::ToolCall`] with a single
//! optional `arguments` field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Result, TranscriptError};

/// The role of a message sender in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// Result of a tool execution
    ToolResult,
    /// System, developer, or any other role this crate does not interpret
    #[serde(other)]
    Other,
}

/// A single message in a transcript, tagged by `role`.
///
/// Messages with an unknown role, or a known role whose fields do not fit the
/// expected shape, are kept verbatim as [`Message::Other`]. Repair stages
/// never pair or rewrite them.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    User(UserMessage),
    Assistant(AssistantMessage),
    ToolResult(ToolResultMessage),
    Other(Value),
}

impl Message {
    /// Create a plain-text user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User(UserMessage {
            content: MessageContent::Text(content.into()),
            timestamp: Some(Utc::now()),
            extra: Map::new(),
        })
    }

    /// Create a user message from content blocks.
    pub fn user_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self::User(UserMessage {
            content: MessageContent::Blocks(blocks),
            timestamp: Some(Utc::now()),
            extra: Map::new(),
        })
    }

    /// Create an assistant message from content blocks.
    pub fn assistant(blocks: Vec<ContentBlock>) -> Self {
        Self::Assistant(AssistantMessage::new(blocks))
    }

    /// Create an assistant message holding a single text block.
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::assistant(vec![ContentBlock::text(text)])
    }

    /// Create a successful tool result message.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::ToolResult(ToolResultMessage::new(
            tool_call_id,
            tool_name,
            MessageContent::Text(content.into()),
            false,
        ))
    }

    /// Create a failed tool result message.
    pub fn tool_error(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::ToolResult(ToolResultMessage::new(
            tool_call_id,
            tool_name,
            MessageContent::Text(content.into()),
            true,
        ))
    }

    pub fn role(&self) -> Role {
        match self {
            Self::User(_) => Role::User,
            Self::Assistant(_) => Role::Assistant,
            Self::ToolResult(_) => Role::ToolResult,
            Self::Other(_) => Role::Other,
        }
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self, Self::Assistant(_))
    }

    pub fn as_assistant(&self) -> Option<&AssistantMessage> {
        match self {
            Self::Assistant(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn as_tool_result(&self) -> Option<&ToolResultMessage> {
        match self {
            Self::ToolResult(msg) => Some(msg),
            _ => None,
        }
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(tag = "role", rename_all = "camelCase")]
        enum Tagged<'a> {
            User(&'a UserMessage),
            Assistant(&'a AssistantMessage),
            ToolResult(&'a ToolResultMessage),
        }

        match self {
            Self::User(msg) => Tagged::User(msg).serialize(serializer),
            Self::Assistant(msg) => Tagged::Assistant(msg).serialize(serializer),
            Self::ToolResult(msg) => Tagged::ToolResult(msg).serialize(serializer),
            Self::Other(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

impl From<Value> for Message {
    fn from(value: Value) -> Self {
        let mut fields = match value {
            Value::Object(map) => map,
            other => return Self::Other(other),
        };
        let Some(role) = fields.remove("role") else {
            return Self::Other(Value::Object(fields));
        };
        let fields = Value::Object(fields);

        let parsed = match role.as_str() {
            Some("user") => UserMessage::deserialize(&fields).map(Self::User),
            Some("assistant") => AssistantMessage::deserialize(&fields).map(Self::Assistant),
            Some("toolResult") => ToolResultMessage::deserialize(&fields).map(Self::ToolResult),
            _ => return Self::Other(with_role(fields, role)),
        };

        match parsed {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(error = %err, "Keeping malformed message verbatim");
                Self::Other(with_role(fields, role))
            }
        }
    }
}

fn with_role(fields: Value, role: Value) -> Value {
    match fields {
        Value::Object(mut map) => {
            map.insert("role".into(), role);
            Value::Object(map)
        }
        other => other,
    }
}

impl From<UserMessage> for Message {
    fn from(msg: UserMessage) -> Self {
        Self::User(msg)
    }
}

impl From<AssistantMessage> for Message {
    fn from(msg: AssistantMessage) -> Self {
        Self::Assistant(msg)
    }
}

impl From<ToolResultMessage> for Message {
    fn from(msg: ToolResultMessage) -> Self {
        Self::ToolResult(msg)
    }
}

/// A message typed by the end user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessage {
    pub content: MessageContent,

    /// Milliseconds since the Unix epoch on the wire
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,

    /// Fields this crate does not interpret, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Why the model stopped generating an assistant turn.
///
/// Any spelling other than the five canonical ones (`end_turn`, `normal`,
/// provider-specific reasons) is kept as [`StopReason::Other`] so it is
/// written back exactly as it was read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StopReason {
    Stop,
    Length,
    ToolUse,
    Error,
    Aborted,
    Other(String),
}

impl StopReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ToolUse => "toolUse",
            Self::Error => "error",
            Self::Aborted => "aborted",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for StopReason {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "toolUse" => Self::ToolUse,
            "error" => Self::Error,
            "aborted" => Self::Aborted,
            _ => Self::Other(raw),
        }
    }
}

impl From<StopReason> for String {
    fn from(reason: StopReason) -> Self {
        match reason {
            StopReason::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

/// A turn produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantMessage {
    /// Text, tool invocations and any provider-specific blocks, in order
    #[serde(default)]
    pub content: Vec<ContentBlock>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,

    /// Model API family that produced this turn (e.g. "openai-completions")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,

    /// Usage, error details and other fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AssistantMessage {
    pub fn new(content: Vec<ContentBlock>) -> Self {
        Self {
            content,
            stop_reason: None,
            api: None,
            provider: None,
            model: None,
            timestamp: Some(Utc::now()),
            extra: Map::new(),
        }
    }

    pub fn with_stop_reason(mut self, reason: StopReason) -> Self {
        self.stop_reason = Some(reason);
        self
    }

    /// Tool invocation blocks, in content order.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallBlock> {
        self.content.iter().filter_map(ContentBlock::as_tool_call)
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls().next().is_some()
    }

    /// True when the turn ended in an error or was aborted mid-generation.
    ///
    /// Tool invocations in such turns may never have been registered by the
    /// provider, so they must not receive results.
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self.stop_reason,
            Some(StopReason::Error | StopReason::Aborted)
        )
    }
}

/// The outcome of a tool execution, correlated to an invocation by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultMessage {
    #[serde(default)]
    pub tool_call_id: String,

    #[serde(default)]
    pub tool_name: String,

    #[serde(default)]
    pub content: MessageContent,

    #[serde(default)]
    pub is_error: bool,

    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolResultMessage {
    pub fn new(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: MessageContent,
        is_error: bool,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            content,
            is_error,
            timestamp: Some(Utc::now()),
            extra: Map::new(),
        }
    }

    /// Concatenated text of the result.
    pub fn text(&self) -> String {
        self.content.text()
    }
}

/// Message content: either a bare string or an ordered list of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// The text carried by this content. Text blocks are joined with
    /// newlines; non-text blocks contribute nothing.
    pub fn text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(ContentBlock::as_text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// How a tool invocation block was spelled by the dialect that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolCallKind {
    ToolCall,
    ToolUse,
    FunctionCall,
}

impl ToolCallKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "toolCall" => Some(Self::ToolCall),
            "toolUse" => Some(Self::ToolUse),
            "functionCall" => Some(Self::FunctionCall),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::ToolCall => "toolCall",
            Self::ToolUse => "toolUse",
            Self::FunctionCall => "functionCall",
        }
    }

    fn default_arguments_key(self) -> ArgumentsKey {
        match self {
            Self::ToolUse => ArgumentsKey::Input,
            Self::ToolCall | Self::FunctionCall => ArgumentsKey::Arguments,
        }
    }
}

/// Which field carried the arguments payload on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentsKey {
    Input,
    Arguments,
}

impl ArgumentsKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Arguments => "arguments",
        }
    }
}

/// A tool invocation inside an assistant message.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallBlock {
    pub kind: ToolCallKind,

    /// Correlation id; empty when the producer omitted it
    pub id: String,

    pub name: String,

    /// `None` when neither `input` nor `arguments` carried a non-null value
    pub arguments: Option<Value>,

    pub arguments_key: ArgumentsKey,

    /// Any other fields (signatures, provider metadata), preserved verbatim
    pub extra: Map<String, Value>,
}

impl ToolCallBlock {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            kind: ToolCallKind::ToolCall,
            id: id.into(),
            name: name.into(),
            arguments: Some(arguments),
            arguments_key: ArgumentsKey::Arguments,
            extra: Map::new(),
        }
    }

    /// A well-formed invocation has a non-blank id and an arguments payload.
    pub fn is_valid(&self) -> bool {
        !self.id.trim().is_empty() && self.arguments.is_some()
    }
}

/// One element of message content.
///
/// (De)serialized through `serde_json::Value` so every dialect spelling maps
/// onto one variant and unknown block types survive a round trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum ContentBlock {
    Text {
        text: String,
        extra: Map<String, Value>,
    },
    ToolCall(ToolCallBlock),
    /// Thinking, images, and anything else this crate does not interpret
    Other(Value),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            extra: Map::new(),
        }
    }

    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self::ToolCall(ToolCallBlock::new(id, name, arguments))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCallBlock> {
        match self {
            Self::ToolCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn is_tool_call(&self) -> bool {
        matches!(self, Self::ToolCall(_))
    }
}

impl TryFrom<Value> for ContentBlock {
    type Error = TranscriptError;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(TranscriptError::InvalidBlock {
                    found: json_kind(&other).into(),
                });
            }
        };

        let tag = map.get("type").and_then(Value::as_str).map(str::to_owned);
        match tag.as_deref() {
            Some("text") if map.get("text").is_some_and(Value::is_string) => {
                map.remove("type");
                let text = match map.remove("text") {
                    Some(Value::String(s)) => s,
                    _ => String::new(),
                };
                Ok(Self::Text { text, extra: map })
            }
            Some(tag) => match ToolCallKind::from_tag(tag) {
                Some(kind) => {
                    map.remove("type");
                    let id = take_string(&mut map, "id");
                    let name = take_string(&mut map, "name");
                    let (arguments, arguments_key) = take_arguments(&mut map, kind);
                    Ok(Self::ToolCall(ToolCallBlock {
                        kind,
                        id,
                        name,
                        arguments,
                        arguments_key,
                        extra: map,
                    }))
                }
                None => Ok(Self::Other(Value::Object(map))),
            },
            None => Ok(Self::Other(Value::Object(map))),
        }
    }
}

impl From<ContentBlock> for Value {
    fn from(block: ContentBlock) -> Self {
        match block {
            ContentBlock::Text { text, mut extra } => {
                extra.insert("type".into(), Value::String("text".into()));
                extra.insert("text".into(), Value::String(text));
                Value::Object(extra)
            }
            ContentBlock::ToolCall(call) => {
                let mut map = call.extra;
                map.insert("type".into(), Value::String(call.kind.tag().into()));
                map.insert("id".into(), Value::String(call.id));
                map.insert("name".into(), Value::String(call.name));
                if let Some(arguments) = call.arguments {
                    map.insert(call.arguments_key.as_str().into(), arguments);
                }
                Value::Object(map)
            }
            ContentBlock::Other(value) => value,
        }
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> String {
    match map.remove(key) {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Pull the arguments payload out of whichever key carries a non-null value.
fn take_arguments(map: &mut Map<String, Value>, kind: ToolCallKind) -> (Option<Value>, ArgumentsKey) {
    for key in [ArgumentsKey::Input, ArgumentsKey::Arguments] {
        if map.get(key.as_str()).is_some_and(|v| !v.is_null()) {
            return (map.remove(key.as_str()), key);
        }
    }

    let key = if map.contains_key("input") {
        ArgumentsKey::Input
    } else if map.contains_key("arguments") {
        ArgumentsKey::Arguments
    } else {
        kind.default_arguments_key()
    };
    map.remove("input");
    map.remove("arguments");
    (None, key)
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parse a transcript from JSON.
///
/// Accepts either a bare array of messages or an object with a `messages`
/// array (the shape session files are usually stored in).
pub fn parse_transcript(input: &str) -> Result<Vec<Message>> {
    let value: Value = serde_json::from_str(input)?;
    let messages = match value {
        v @ Value::Array(_) => v,
        Value::Object(mut map) => match map.remove("messages") {
            Some(v @ Value::Array(_)) => v,
            _ => {
                return Err(TranscriptError::InvalidTranscript(
                    "object has no `messages` array".into(),
                )
                .into());
            }
        },
        other => {
            return Err(TranscriptError::InvalidTranscript(format!(
                "found {}",
                json_kind(&other)
            ))
            .into());
        }
    };

    let messages: Vec<Message> = serde_json::from_value(messages)?;
    tracing::debug!(count = messages.len(), "Parsed transcript");
    Ok(messages)
}
