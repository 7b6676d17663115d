//! Error types for the response-processing pipeline.

use thiserror::Error;

/// Failure modes of decoding, parsing, and merging
///
/// The frame decoder itself never produces these: an incomplete-looking
/// segment is carried in the tail and retried on the next chunk. Everything
/// here is a terminal failure value the dispatcher surfaces to its caller;
/// retry policy belongs to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// A frame payload was not syntactically valid JSON
    #[error("Received invalid JSON: {0}")]
    MalformedFrame(String),

    /// Well-formed JSON matching no known response shape
    #[error("Unexpected response")]
    UnrecognizedShape,

    /// A tool call inside a response carried arguments that never parsed
    #[error("tool_calls: arguments: invalid json")]
    InvalidToolCallArguments,

    /// A bare tool-call object carried arguments that never parsed
    #[error("arguments: invalid json")]
    InvalidArguments,

    /// The provider returned a structured error body instead of a completion
    #[error("{0}")]
    Upstream(String),

    /// No data arrived from the transport within its deadline
    #[error("timed out waiting for response data")]
    TransportTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_strings() {
        assert_eq!(
            StreamError::MalformedFrame("not json".to_string()).to_string(),
            "Received invalid JSON: not json"
        );
        assert_eq!(
            StreamError::UnrecognizedShape.to_string(),
            "Unexpected response"
        );
        assert_eq!(
            StreamError::InvalidToolCallArguments.to_string(),
            "tool_calls: arguments: invalid json"
        );
        assert_eq!(
            StreamError::InvalidArguments.to_string(),
            "arguments: invalid json"
        );
        assert_eq!(
            StreamError::Upstream("Request too large".to_string()).to_string(),
            "Request too large"
        );
    }
}
