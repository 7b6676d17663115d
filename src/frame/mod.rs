//! Wire-frame decoding for server-sent event streams.
//!
//! Splits raw chunk text, possibly the concatenation of a previous
//! incomplete tail and new input, into zero or more complete event payloads
//! plus a new incomplete tail. This layer never fails: anything that does
//! not yet end in an event boundary rides in the tail and is retried when
//! the next chunk arrives.

mod decoder;

pub use decoder::{decode, FrameDecoder};
