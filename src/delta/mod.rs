//! Delta parsing for completion payloads.
//!
//! Converts one decoded frame payload (a JSON document following the
//! provider's completion/delta schema) into typed delta records or terminal
//! messages. Pure mapping, no side effects; every recognized shape has its
//! own [`Parsed`] variant and callers switch on the result kind.

mod parser;
mod types;

pub use parser::{parse, Parsed};
pub use types::{MessageDelta, ToolCallDelta};
