//! Typed delta records and raw wire shapes.

use serde::{Deserialize, Serialize};

use crate::{MessageStatus, Role, ToolCallStatus, ToolKind};

// ============================================================================
// Delta Records
// ============================================================================

/// One streamed slice of one tool call
///
/// Identified by its position (`index`) among parallel tool calls in the
/// same choice. Fields absent in one chunk routinely appear in the next for
/// the same index; absence never means clearing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Position among parallel tool calls in this choice
    pub index: usize,
    /// Provider-assigned call id, usually only in the first fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Kind of invocation
    #[serde(rename = "type", default)]
    pub kind: ToolKind,
    /// Tool name, usually only in the first fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Raw argument text fragment, appended to the accumulation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments_fragment: Option<String>,
    /// Whether this call's arguments are finished
    #[serde(default)]
    pub status: ToolCallStatus,
}

/// One slice of one choice's evolving message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDelta {
    /// Role, if this slice carried one
    ///
    /// Providers attach `role` only to the first delta of a choice;
    /// every later slice is [`Role::Unknown`].
    #[serde(default)]
    pub role: Role,
    /// Text fragment to append to the choice's content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_fragment: Option<String>,
    /// Tool-call fragments carried by this slice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
    /// Choice index this slice belongs to
    pub index: usize,
    /// Status derived from `finish_reason`
    #[serde(default)]
    pub status: MessageStatus,
}

impl MessageDelta {
    /// Whether this slice terminates its choice
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// ============================================================================
// Raw Wire Shapes
// ============================================================================
//
// Optional-everything mirrors of the provider's JSON. Deserialization never
// fails on missing fields; shape decisions happen in the parser.

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawChunk {
    pub choices: Vec<RawChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawChoice {
    pub index: Option<usize>,
    pub delta: Option<RawDelta>,
    pub message: Option<RawDelta>,
    pub finish_reason: Option<String>,
}

/// Streamed `delta` and terminal `message` bodies share one field set.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawDelta {
    pub role: Option<String>,
    pub content: Option<String>,
    pub tool_calls: Option<Vec<RawToolCall>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawToolCall {
    pub index: Option<usize>,
    pub id: Option<String>,
    #[allow(dead_code)]
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub function: Option<RawFunction>,
    // Flat variants carry name/arguments at the top level.
    pub name: Option<String>,
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawFunction {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

impl RawToolCall {
    /// Tool name from either the nested or the flat encoding
    pub fn name(&self) -> Option<&str> {
        self.function
            .as_ref()
            .and_then(|f| f.name.as_deref())
            .or(self.name.as_deref())
    }

    /// Argument text from either the nested or the flat encoding
    pub fn arguments(&self) -> Option<&str> {
        self.function
            .as_ref()
            .and_then(|f| f.arguments.as_deref())
            .or(self.arguments.as_deref())
    }
}
