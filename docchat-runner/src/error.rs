//! Error types for the `docchat-runner` crate.

use std::time::Duration;

use docchat_model::ModelError;
use docchat_rag::RagError;
use thiserror::Error;

/// Why a chat request did not complete.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The request or the orchestrator configuration is unusable.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Retrieving context for the question failed.
    #[error("Retrieval failed: {0}")]
    RetrievalFailed(#[source] RagError),

    /// The completion backend failed to start or broke off mid-stream.
    #[error("Completion failed: {0}")]
    CompletionFailed(#[source] ModelError),

    /// A stage did not finish within its configured limit.
    #[error("{stage} timed out after {timeout:?}")]
    Timeout {
        /// `retrieval`, `completion` or `stream`.
        stage: &'static str,
        /// The configured limit.
        timeout: Duration,
    },

    /// The caller cancelled the request.
    #[error("Request cancelled")]
    Cancelled,
}

impl ChatError {
    /// Short machine-readable code, used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::InvalidParameters(_) => "invalid_parameters",
            ChatError::RetrievalFailed(_) => "retrieval_failed",
            ChatError::CompletionFailed(_) => "completion_failed",
            ChatError::Timeout { .. } => "timeout",
            ChatError::Cancelled => "cancelled",
        }
    }
}

/// Result type alias for chat operations.
pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let timeout = ChatError::Timeout { stage: "stream", timeout: Duration::from_secs(1) };
        assert_eq!(timeout.code(), "timeout");
        assert_eq!(timeout.to_string(), "stream timed out after 1s");
        assert_eq!(ChatError::Cancelled.code(), "cancelled");
        let rejected = ModelError::Rejected { provider: "p".into(), message: "m".into() };
        assert_eq!(ChatError::CompletionFailed(rejected).code(), "completion_failed");
    }
}
