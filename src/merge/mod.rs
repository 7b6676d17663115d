//! Delta merging into per-choice message state.
//!
//! Folds an ordered sequence of [`MessageDelta`](crate::MessageDelta)
//! records into cumulative state for one choice, producing a single
//! terminal [`Message`](crate::Message) the instant a completion signal
//! arrives. Handles sparse, index-keyed parallel tool calls: a provider may
//! stream several calls concurrently, interleaving argument fragments for
//! different indices.

mod accumulator;

pub use accumulator::{ChoiceAccumulator, MergeOutcome};
