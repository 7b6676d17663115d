//! Shape-sniffing payload parser.

use serde_json::Value;

use super::types::{RawChoice, RawChunk, RawToolCall};
use super::{MessageDelta, ToolCallDelta};
use crate::error::StreamError;
use crate::{Message, MessageStatus, Role, ToolArguments, ToolCall, ToolCallStatus, ToolKind};

/// Result of parsing one payload
///
/// The variant depends on which input shape matched; callers switch on the
/// kind. Parse failures are [`StreamError`] values, never panics.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    /// Streaming chunk: one delta per choice
    Deltas(Vec<MessageDelta>),
    /// Complete (non-streamed) response: one terminal message per choice
    Messages(Vec<Message>),
    /// Bare terminal tool-call object
    ToolCall(ToolCall),
    /// Bare streamed tool-call fragment, wrapped for the merge engine
    Delta(MessageDelta),
}

/// Parse one frame payload into typed records.
///
/// Matching priority: `choices[].delta` (streaming), `choices[].message`
/// (complete response), provider error body, bare tool-call object. Input
/// that is not valid JSON reports [`StreamError::MalformedFrame`] carrying
/// the original text; well-formed JSON matching nothing reports
/// [`StreamError::UnrecognizedShape`].
pub fn parse(payload: &str) -> Result<Parsed, StreamError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|_| StreamError::MalformedFrame(payload.to_string()))?;
    parse_value(&value)
}

/// Parse an already-decoded JSON value.
pub(crate) fn parse_value(value: &Value) -> Result<Parsed, StreamError> {
    let Some(object) = value.as_object() else {
        return Err(StreamError::UnrecognizedShape);
    };

    if object.contains_key("choices") {
        let chunk: RawChunk =
            serde_json::from_value(value.clone()).map_err(|_| StreamError::UnrecognizedShape)?;
        return parse_choices(chunk);
    }

    if let Some(body) = object.get("error") {
        return Err(StreamError::Upstream(upstream_reason(body)));
    }

    if object.contains_key("function")
        || (object.contains_key("name") && object.contains_key("arguments"))
    {
        let call: RawToolCall =
            serde_json::from_value(value.clone()).map_err(|_| StreamError::UnrecognizedShape)?;
        return parse_bare_tool_call(call);
    }

    Err(StreamError::UnrecognizedShape)
}

fn parse_choices(chunk: RawChunk) -> Result<Parsed, StreamError> {
    // `delta` wins over `message` when sniffing the shape.
    if chunk.choices.iter().any(|c| c.delta.is_some()) {
        return parse_streaming(chunk);
    }
    if chunk.choices.iter().any(|c| c.message.is_some()) {
        return parse_complete(chunk);
    }
    if chunk.choices.is_empty() {
        // Keep-alive chunks with no choices carry nothing to merge.
        return Ok(Parsed::Deltas(Vec::new()));
    }
    Err(StreamError::UnrecognizedShape)
}

fn parse_streaming(chunk: RawChunk) -> Result<Parsed, StreamError> {
    let mut deltas = Vec::with_capacity(chunk.choices.len());
    for (position, choice) in chunk.choices.into_iter().enumerate() {
        let RawChoice {
            index,
            delta,
            finish_reason,
            ..
        } = choice;
        let body = delta.unwrap_or_default();
        deltas.push(MessageDelta {
            role: role_from(body.role.as_deref()),
            content_fragment: body.content,
            tool_calls: body.tool_calls.map(|calls| {
                calls
                    .into_iter()
                    .enumerate()
                    .map(|(pos, raw)| tool_call_delta(pos, raw))
                    .collect()
            }),
            index: index.unwrap_or(position),
            status: MessageStatus::from_finish_reason(finish_reason.as_deref()),
        });
    }
    Ok(Parsed::Deltas(deltas))
}

fn parse_complete(chunk: RawChunk) -> Result<Parsed, StreamError> {
    let mut messages = Vec::with_capacity(chunk.choices.len());
    for (position, choice) in chunk.choices.into_iter().enumerate() {
        let Some(body) = choice.message else {
            return Err(StreamError::UnrecognizedShape);
        };

        let tool_calls = match body.tool_calls {
            None => None,
            Some(calls) => {
                let mut built = Vec::with_capacity(calls.len());
                for raw in calls {
                    // Complete responses carry full argument strings; they
                    // must parse now or the whole response fails.
                    let arguments: Value = serde_json::from_str(raw.arguments().unwrap_or(""))
                        .map_err(|_| StreamError::InvalidToolCallArguments)?;
                    let name = raw.name().unwrap_or("").to_string();
                    built.push(ToolCall {
                        id: raw.id.unwrap_or_default(),
                        kind: ToolKind::Function,
                        name,
                        arguments: ToolArguments::Json(arguments),
                        status: ToolCallStatus::Complete,
                    });
                }
                Some(built)
            }
        };

        messages.push(Message {
            role: role_from(body.role.as_deref()),
            content: body.content,
            tool_calls,
            index: choice.index.unwrap_or(position),
            status: MessageStatus::from_finish_reason(choice.finish_reason.as_deref()),
        });
    }
    Ok(Parsed::Messages(messages))
}

fn parse_bare_tool_call(raw: RawToolCall) -> Result<Parsed, StreamError> {
    let name = raw.name().map(String::from);
    let arguments = raw.arguments().map(String::from);

    if let (Some(name), Some(text)) = (&name, &arguments) {
        return match serde_json::from_str::<Value>(text) {
            Ok(value) => Ok(Parsed::ToolCall(ToolCall {
                id: raw.id.unwrap_or_default(),
                kind: ToolKind::Function,
                name: name.clone(),
                arguments: ToolArguments::Json(value),
                status: ToolCallStatus::Complete,
            })),
            Err(_) => Err(StreamError::InvalidArguments),
        };
    }

    // Partial fields only: a streamed fragment bound for the merge engine.
    let index = raw.index.unwrap_or(0);
    Ok(Parsed::Delta(MessageDelta {
        role: Role::Unknown,
        content_fragment: None,
        tool_calls: Some(vec![ToolCallDelta {
            index,
            id: raw.id,
            kind: ToolKind::Function,
            name,
            arguments_fragment: arguments,
            status: ToolCallStatus::Incomplete,
        }]),
        index: 0,
        status: MessageStatus::Incomplete,
    }))
}

fn tool_call_delta(position: usize, raw: RawToolCall) -> ToolCallDelta {
    let name = raw.name().map(String::from);
    let arguments_fragment = raw.arguments().map(String::from);
    ToolCallDelta {
        index: raw.index.unwrap_or(position),
        id: raw.id,
        kind: ToolKind::Function,
        name,
        arguments_fragment,
        status: ToolCallStatus::Incomplete,
    }
}

fn role_from(raw: Option<&str>) -> Role {
    match raw {
        Some("system") => Role::System,
        Some("user") => Role::User,
        Some("assistant") => Role::Assistant,
        Some("tool") => Role::Tool,
        _ => Role::Unknown,
    }
}

fn upstream_reason(body: &Value) -> String {
    if let Some(text) = body.as_str() {
        return text.to_string();
    }
    if let Some(text) = body.get("message").and_then(Value::as_str) {
        return text.to_string();
    }
    body.to_string()
}
