//! Error types for completion backends.

use thiserror::Error;

/// Errors raised by a [`CompletionBackend`](crate::CompletionBackend).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    /// The backend could not be reached or failed transiently.
    #[error("Completion backend unavailable ({provider}): {message}")]
    BackendUnavailable {
        /// The backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The backend refused the request (unknown model, bad parameters, ...).
    #[error("Completion request rejected ({provider}): {message}")]
    Rejected {
        /// The backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The response stream broke off or contained something unparseable.
    #[error("Completion stream error ({provider}): {message}")]
    Stream {
        /// The backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },
}

impl ModelError {
    /// Whether a fresh request may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ModelError::BackendUnavailable { .. })
    }
}

/// Result type alias for completion operations.
pub type Result<T> = std::result::Result<T, ModelError>;
