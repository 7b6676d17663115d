//! Response dispatching.
//!
//! Thin orchestration over the lower layers: feeds frame-decoder output
//! through the delta parser and merge engine, invoking a caller-supplied
//! sink once per produced unit. Streaming calls get one sink invocation per
//! delta (intermediates included); non-streaming calls get one per terminal
//! message. One [`Dispatcher`] owns the tail buffer and per-choice
//! accumulators for exactly one logical call, so independent calls run in
//! parallel with no shared state.

use std::collections::BTreeMap;

use crate::delta::{parse, MessageDelta, Parsed};
use crate::error::StreamError;
use crate::frame::FrameDecoder;
use crate::merge::{ChoiceAccumulator, MergeOutcome};
use crate::Message;

/// Per-call streaming orchestrator
///
/// Feed wire chunks with [`push`](Self::push), then collect the terminal
/// messages with [`finish`](Self::finish). Any parse or merge error aborts
/// the call; no partial message collection is returned for a call that
/// errored.
#[derive(Debug, Default)]
pub struct Dispatcher {
    decoder: FrameDecoder,
    choices: BTreeMap<usize, ChoiceAccumulator>,
    finished: BTreeMap<usize, Message>,
}

impl Dispatcher {
    /// Create a dispatcher for one logical streamed call
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one wire chunk, invoking `sink` per produced delta.
    ///
    /// Frames are decoded, parsed, and merged synchronously in arrival
    /// order; the sink runs on the caller's execution context and sits on
    /// the chunk-delivery critical path. Deltas for a choice that already
    /// emitted its terminal message are ignored with an anomaly log and do
    /// not reach the sink, so the observed delta sequence matches what the
    /// terminal message contains.
    pub fn push(
        &mut self,
        chunk: &str,
        mut sink: impl FnMut(&MessageDelta),
    ) -> Result<(), StreamError> {
        for frame in self.decoder.feed(chunk) {
            match parse(&frame)? {
                Parsed::Deltas(deltas) => {
                    for delta in deltas {
                        self.merge(delta, &mut sink)?;
                    }
                }
                Parsed::Delta(delta) => self.merge(delta, &mut sink)?,
                Parsed::Messages(messages) => {
                    // Some providers answer a streamed request with one
                    // complete body; it needs no merge state.
                    tracing::debug!(count = messages.len(), "complete response body on stream");
                    for message in messages {
                        self.finished.entry(message.index).or_insert(message);
                    }
                }
                Parsed::ToolCall(call) => {
                    // Bare tool-call frames carry no choice wrapper; they
                    // collect into one index-0 message across the stream.
                    match self.finished.get_mut(&0) {
                        Some(message) => {
                            message.tool_calls.get_or_insert_with(Vec::new).push(call);
                        }
                        None => {
                            let message = Message::assistant_with_tools(None, vec![call]);
                            self.finished.insert(message.index, message);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn merge(
        &mut self,
        delta: MessageDelta,
        sink: &mut impl FnMut(&MessageDelta),
    ) -> Result<(), StreamError> {
        if self.finished.contains_key(&delta.index) {
            // The choice already emitted its terminal message; a straggler
            // must not corrupt or abort it, and never reaches the sink.
            tracing::warn!(
                index = delta.index,
                "delta arrived after choice finished; ignoring"
            );
            return Ok(());
        }
        sink(&delta);
        let accumulator = self
            .choices
            .entry(delta.index)
            .or_insert_with(|| ChoiceAccumulator::new(delta.index));
        match accumulator.apply(&delta)? {
            MergeOutcome::Accumulating => {}
            MergeOutcome::Finished(message) => {
                self.choices.remove(&delta.index);
                self.finished.entry(message.index).or_insert(message);
            }
        }
        Ok(())
    }

    /// Whether every choice seen so far has terminated
    pub fn is_settled(&self) -> bool {
        self.choices.is_empty() && !self.finished.is_empty()
    }

    /// Conclude the call and return terminal messages in index order.
    ///
    /// Choices still incomplete when the caller stops feeding chunks are
    /// emitted with their partial state and `Incomplete` status rather than
    /// dropped; at most one message is returned per choice index.
    pub fn finish(mut self) -> Result<Vec<Message>, StreamError> {
        if self.decoder.has_pending() {
            tracing::debug!(
                tail_len = self.decoder.tail().len(),
                "stream ended with undecoded tail"
            );
        }
        for (index, mut accumulator) in std::mem::take(&mut self.choices) {
            let message = accumulator.finish()?;
            self.finished.entry(index).or_insert(message);
        }
        Ok(self.finished.into_values().collect())
    }

    /// Consume an entire chunk stream into terminal messages.
    ///
    /// Convenience wrapper over [`push`](Self::push)/[`finish`](Self::finish)
    /// for callers holding a `futures_util::Stream` of wire chunks. The
    /// transport maps its own failures (including timeouts) into
    /// [`StreamError`] via the `Into` bound.
    pub async fn fold_stream<S, E, F>(mut stream: S, mut sink: F) -> Result<Vec<Message>, StreamError>
    where
        S: futures_util::Stream<Item = Result<String, E>> + Unpin,
        E: Into<StreamError>,
        F: FnMut(&MessageDelta),
    {
        use futures_util::StreamExt;

        let mut dispatcher = Self::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(Into::into)?;
            dispatcher.push(&chunk, &mut sink)?;
        }
        dispatcher.finish()
    }
}

/// Parse one complete (non-streamed) response body.
///
/// Invokes `sink` once per terminal message and returns the collection in
/// provider order; no merge state is involved. A bare terminal tool-call
/// body is wrapped in a single complete assistant message so both paths
/// produce the same unit.
pub fn parse_response(
    body: &str,
    mut sink: impl FnMut(&Message),
) -> Result<Vec<Message>, StreamError> {
    match parse(body)? {
        Parsed::Messages(messages) => {
            for message in &messages {
                sink(message);
            }
            Ok(messages)
        }
        Parsed::ToolCall(call) => {
            let message = Message::assistant_with_tools(None, vec![call]);
            sink(&message);
            Ok(vec![message])
        }
        // Streaming shapes do not belong in a complete response body.
        Parsed::Deltas(_) | Parsed::Delta(_) => Err(StreamError::UnrecognizedShape),
    }
}
