//! Error types for the `docchat-memory` crate.

use thiserror::Error;

/// Errors raised when building a memory store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MemoryError {
    /// The store configuration is unusable.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Result type alias for memory operations.
pub type Result<T> = std::result::Result<T, MemoryError>;
