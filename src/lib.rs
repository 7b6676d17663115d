//! Streamfold
//!
//! This crate turns the raw, chunked byte stream of a chat-completion style
//! API into fully-typed, incrementally-merged message objects, and turns
//! complete (non-streamed) JSON responses into the same typed objects.
//!
//! The pipeline is four layers, each depending only on the one below it:
//!
//! 1. [`frame`] - splits wire bytes into complete SSE event payloads,
//!    carrying an incomplete tail forward across chunk boundaries.
//! 2. [`delta`] - parses one payload into typed delta records or terminal
//!    messages, following the OpenAI-compatible completion schema.
//! 3. [`merge`] - folds an ordered sequence of deltas into per-choice
//!    message state, emitting a terminal [`Message`] once a completion
//!    signal arrives.
//! 4. [`dispatch`] - the thin orchestration feeding frames through the
//!    parser and merge engine, invoking a caller-supplied sink per delta.
//!
//! Data flows strictly one way: bytes -> frames -> deltas -> merged state
//! -> callback.
//!
//! ## Usage
//!
//! ```rust
//! use streamfold::Dispatcher;
//!
//! let mut dispatcher = Dispatcher::new();
//! let chunk = "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Hi\"},\"finish_reason\":\"stop\"}]}\n\n";
//!
//! dispatcher.push(chunk, |delta| {
//!     if let Some(text) = &delta.content_fragment {
//!         print!("{text}");
//!     }
//! }).unwrap();
//!
//! let messages = dispatcher.finish().unwrap();
//! assert_eq!(messages[0].content.as_deref(), Some("Hi"));
//! ```
//!
//! ## Scope
//!
//! HTTP transport, request construction, authentication, and conversation
//! history are collaborator concerns: this crate consumes raw chunks and
//! produces typed deltas and messages, nothing else. Parse outcomes are
//! reported as terminal vs. recoverable; retry policy stays with the
//! transport.

use serde::{Deserialize, Serialize};

// ============================================================================
// Pipeline Modules
// ============================================================================

pub mod delta;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod merge;

pub use delta::{parse, MessageDelta, Parsed, ToolCallDelta};
pub use dispatch::{parse_response, Dispatcher};
pub use error::StreamError;
pub use frame::FrameDecoder;
pub use merge::{ChoiceAccumulator, MergeOutcome};

// ============================================================================
// Core Message Types
// ============================================================================

/// Message role in a conversation
///
/// Streaming providers only attach `role` to the first delta of a choice;
/// later deltas omit it, which maps to [`Role::Unknown`] rather than being
/// assumed `assistant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions
    System,
    /// User input
    User,
    /// Assistant response
    Assistant,
    /// Tool execution result
    Tool,
    /// Role not yet observed or not recognized
    ///
    /// Wire role strings are mapped in the delta parser, which folds
    /// unrecognized values here rather than failing deserialization.
    Unknown,
}

impl Role {
    /// Convert to string representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::Unknown => "unknown",
        }
    }

    /// Whether a concrete role has been observed
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Completion status of one choice's message
///
/// Derived from the provider's `finish_reason`: `null` means the choice is
/// still streaming, `"stop"` and `"tool_calls"` both mean a normal finish,
/// `"length"` means the token limit truncated the output, and any other
/// non-null value is treated as cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Choice is still streaming
    Incomplete,
    /// Choice finished normally (`stop` or `tool_calls`)
    Complete,
    /// Choice was truncated by the token limit
    Length,
    /// Choice ended for any other provider-reported reason
    Cancelled,
}

impl MessageStatus {
    /// Derive a status from a raw `finish_reason` value
    pub fn from_finish_reason(reason: Option<&str>) -> Self {
        match reason {
            None => Self::Incomplete,
            Some("stop") | Some("tool_calls") => Self::Complete,
            Some("length") => Self::Length,
            Some(_) => Self::Cancelled,
        }
    }

    /// Whether this status ends the choice
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Incomplete)
    }
}

impl Default for MessageStatus {
    fn default() -> Self {
        Self::Incomplete
    }
}

/// Completion status of one tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    /// Arguments still accumulating, or never proven valid JSON
    Incomplete,
    /// Arguments fully received and parsed
    Complete,
}

impl Default for ToolCallStatus {
    fn default() -> Self {
        Self::Incomplete
    }
}

/// Kind of tool invocation
///
/// Only function calls exist in the consumed schema today; a closed enum
/// keeps unrecognized kinds from silently passing through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// A function call
    Function,
}

impl Default for ToolKind {
    fn default() -> Self {
        Self::Function
    }
}

/// Arguments of a tool call
///
/// Streamed argument text is accumulated as raw fragments and only parsed
/// once the owning choice terminates, so a call can legitimately hold
/// unparsed text. A [`ToolCall`] with [`ToolCallStatus::Complete`] always
/// holds the [`ToolArguments::Json`] variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolArguments {
    /// Successfully parsed argument object
    Json(serde_json::Value),
    /// Raw accumulated text that was never parsed
    Raw(String),
}

impl ToolArguments {
    /// Get the parsed argument value, if parsing succeeded
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// Get the raw accumulated text, if arguments were never parsed
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Self::Raw(text) => Some(text),
            Self::Json(_) => None,
        }
    }
}

/// A terminal tool call
///
/// Produced once per streamed tool call when its choice terminates, or
/// eagerly for non-streamed responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned identifier for this call
    pub id: String,
    /// Kind of invocation
    #[serde(rename = "type", default)]
    pub kind: ToolKind,
    /// Name of the tool to call
    pub name: String,
    /// Accumulated arguments
    pub arguments: ToolArguments,
    /// Whether the arguments were fully received and parsed
    #[serde(default)]
    pub status: ToolCallStatus,
}

impl ToolCall {
    /// Create a complete tool call with parsed arguments
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            kind: ToolKind::Function,
            name: name.into(),
            arguments: ToolArguments::Json(arguments),
            status: ToolCallStatus::Complete,
        }
    }
}

/// A terminal message for one choice
///
/// Produced once per choice per response: at stream end for streamed calls,
/// immediately for non-streamed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,
    /// Accumulated text content
    ///
    /// `None` means no content was ever sent, which is distinct from an
    /// empty string having been sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool calls requested by this message, in index order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Choice index this message belongs to
    pub index: usize,
    /// Terminal status of the choice
    pub status: MessageStatus,
}

impl Message {
    /// Create a complete assistant message with text content
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(text.into()),
            tool_calls: None,
            index: 0,
            status: MessageStatus::Complete,
        }
    }

    /// Create a complete assistant message carrying tool calls
    pub fn assistant_with_tools(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: Some(tool_calls),
            index: 0,
            status: MessageStatus::Complete,
        }
    }

    /// Get text content, if any was sent
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_string_conversion() {
        assert_eq!(Role::System.as_str(), "system");
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Assistant.as_str(), "assistant");
        assert_eq!(Role::Tool.as_str(), "tool");
        assert_eq!(Role::Unknown.as_str(), "unknown");
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_value(Role::Assistant).unwrap(), "assistant");
        assert_eq!(serde_json::to_value(Role::Unknown).unwrap(), "unknown");

        let role: Role = serde_json::from_str("\"assistant\"").unwrap();
        assert_eq!(role, Role::Assistant);
    }

    #[test]
    fn test_status_from_finish_reason() {
        assert_eq!(
            MessageStatus::from_finish_reason(None),
            MessageStatus::Incomplete
        );
        assert_eq!(
            MessageStatus::from_finish_reason(Some("stop")),
            MessageStatus::Complete
        );
        assert_eq!(
            MessageStatus::from_finish_reason(Some("tool_calls")),
            MessageStatus::Complete
        );
        assert_eq!(
            MessageStatus::from_finish_reason(Some("length")),
            MessageStatus::Length
        );
        assert_eq!(
            MessageStatus::from_finish_reason(Some("content_filter")),
            MessageStatus::Cancelled
        );
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!MessageStatus::Incomplete.is_terminal());
        assert!(MessageStatus::Complete.is_terminal());
        assert!(MessageStatus::Length.is_terminal());
        assert!(MessageStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_tool_call_creation() {
        let call = ToolCall::new("call_123", "search", serde_json::json!({"q": "weather"}));
        assert_eq!(call.id, "call_123");
        assert_eq!(call.name, "search");
        assert_eq!(call.status, ToolCallStatus::Complete);
        assert_eq!(call.arguments.as_json().unwrap()["q"], "weather");
    }

    #[test]
    fn test_tool_arguments_accessors() {
        let parsed = ToolArguments::Json(serde_json::json!({"a": 1}));
        assert!(parsed.as_json().is_some());
        assert!(parsed.as_raw().is_none());

        let raw = ToolArguments::Raw("{\"a\":".to_string());
        assert_eq!(raw.as_raw(), Some("{\"a\":"));
        assert!(raw.as_json().is_none());
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::assistant("Hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "Hello");
        assert_eq!(json["status"], "complete");
        // tool_calls omitted when absent
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn test_message_roundtrip() {
        let msg = Message::assistant_with_tools(
            Some("Looking that up".to_string()),
            vec![ToolCall::new(
                "call_1",
                "get_weather",
                serde_json::json!({"location": "SF"}),
            )],
        );
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
