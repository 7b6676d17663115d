//! Per-choice delta accumulator.

use std::collections::BTreeMap;

use crate::delta::MessageDelta;
use crate::error::StreamError;
use crate::{Message, MessageStatus, Role, ToolArguments, ToolCall, ToolCallStatus, ToolKind};

/// Result of applying one delta to an accumulator
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// The choice is still streaming; keep feeding deltas
    Accumulating,
    /// The choice terminated; no further deltas are expected
    Finished(Message),
}

/// Accumulates one tool call's fragments.
///
/// `id` and `name` adopt the first non-null value seen; argument fragments
/// are concatenated as raw text, never JSON-merged.
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Accumulates streamed deltas for one choice index.
///
/// Created lazily on the first delta for an index and consumed when that
/// choice's status goes terminal. Tool calls accumulate in an index-keyed
/// map because indices need not be contiguous: a provider may stream a
/// tool call at index 1 while index 0 carried text.
#[derive(Debug)]
pub struct ChoiceAccumulator {
    index: usize,
    role: Role,
    content: Option<String>,
    tool_calls: BTreeMap<usize, ToolCallAccumulator>,
    status: MessageStatus,
}

impl ChoiceAccumulator {
    /// Create an empty accumulator for one choice index
    pub fn new(index: usize) -> Self {
        Self {
            index,
            role: Role::Unknown,
            content: None,
            tool_calls: BTreeMap::new(),
            status: MessageStatus::Incomplete,
        }
    }

    /// The choice index this accumulator owns
    pub fn index(&self) -> usize {
        self.index
    }

    /// Current status of the choice
    pub fn status(&self) -> MessageStatus {
        self.status
    }

    /// Fold one delta into the accumulated state.
    ///
    /// Deltas arriving after the choice already terminated are ignored with
    /// an anomaly log; already-emitted state is never corrupted.
    pub fn apply(&mut self, delta: &MessageDelta) -> Result<MergeOutcome, StreamError> {
        if self.status.is_terminal() {
            tracing::warn!(
                index = self.index,
                status = ?self.status,
                "delta arrived after terminal status; ignoring"
            );
            return Ok(MergeOutcome::Accumulating);
        }

        // Role is sticky: once concrete, a later Unknown never overwrites.
        if delta.role.is_known() && !self.role.is_known() {
            self.role = delta.role;
        }

        if let Some(fragment) = &delta.content_fragment {
            match &mut self.content {
                Some(text) => text.push_str(fragment),
                None => self.content = Some(fragment.clone()),
            }
        }

        if let Some(calls) = &delta.tool_calls {
            for call in calls {
                let slot = self.tool_calls.entry(call.index).or_default();
                if slot.id.is_none() {
                    slot.id.clone_from(&call.id);
                }
                if slot.name.is_none() {
                    slot.name.clone_from(&call.name);
                }
                if let Some(fragment) = &call.arguments_fragment {
                    slot.arguments.push_str(fragment);
                }
            }
        }

        if delta.status.is_terminal() {
            self.status = delta.status;
            return Ok(MergeOutcome::Finished(self.finish()?));
        }

        Ok(MergeOutcome::Accumulating)
    }

    /// Build the terminal message from the accumulated state.
    ///
    /// On a normal finish (`Complete`/`Length`) every accumulated tool
    /// call's raw argument text must parse as JSON; a failure is logged per
    /// call, siblings are still processed, and the whole choice reports
    /// [`StreamError::InvalidToolCallArguments`]. A cancelled choice keeps
    /// its calls incomplete with raw arguments and skips parsing.
    pub(crate) fn finish(&mut self) -> Result<Message, StreamError> {
        let parse_arguments = matches!(self.status, MessageStatus::Complete | MessageStatus::Length);

        let mut built = Vec::with_capacity(self.tool_calls.len());
        let mut invalid = false;
        for (index, slot) in std::mem::take(&mut self.tool_calls) {
            // Calls that never received a name carry nothing callable.
            let Some(name) = slot.name else {
                tracing::warn!(index, "dropping tool call with no name");
                continue;
            };

            let (arguments, status) = if parse_arguments {
                match serde_json::from_str(&slot.arguments) {
                    Ok(value) => (ToolArguments::Json(value), ToolCallStatus::Complete),
                    Err(error) => {
                        tracing::warn!(index, %error, "tool call arguments failed to parse");
                        invalid = true;
                        (
                            ToolArguments::Raw(slot.arguments),
                            ToolCallStatus::Incomplete,
                        )
                    }
                }
            } else {
                (
                    ToolArguments::Raw(slot.arguments),
                    ToolCallStatus::Incomplete,
                )
            };

            built.push(ToolCall {
                id: slot.id.unwrap_or_default(),
                kind: ToolKind::Function,
                name,
                arguments,
                status,
            });
        }

        if invalid {
            return Err(StreamError::InvalidToolCallArguments);
        }

        Ok(Message {
            role: self.role,
            content: self.content.take(),
            tool_calls: if built.is_empty() { None } else { Some(built) },
            index: self.index,
            status: self.status,
        })
    }
}
