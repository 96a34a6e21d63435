//! Error types for the `docchat-rag` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in ingestion and retrieval operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Chunking or configuration parameters are inconsistent.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The embedding backend refused the input (for example empty text).
    #[error("Invalid embedding input ({provider}): {message}")]
    InvalidInput {
        /// The embedding provider that rejected the input.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding backend could not be reached or failed transiently.
    #[error("Embedding backend unavailable ({provider}): {message}")]
    BackendUnavailable {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector store backend could not be reached or failed transiently.
    #[error("Vector index unavailable ({backend}): {message}")]
    IndexUnavailable {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector does not have the dimensionality fixed for the index or embedder.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimensionality the index or embedder was created with.
        expected: usize,
        /// The dimensionality that was supplied.
        actual: usize,
    },

    /// Ingestion stopped part way. Safe to retry: upserts are idempotent by identifier.
    #[error("Ingestion failed after committing {committed} segment(s), {pending} pending: {source}")]
    IngestionFailed {
        /// Segments already written to the index.
        committed: usize,
        /// Segments not yet written.
        pending: usize,
        /// The error that stopped ingestion.
        #[source]
        source: Box<RagError>,
    },

    /// A suspension point did not finish in time.
    #[error("{stage} timed out after {timeout:?}")]
    Timeout {
        /// The stage that timed out (`embed`, `search`, ...).
        stage: &'static str,
        /// The configured limit.
        timeout: Duration,
    },

    /// A document source could not be read.
    #[error("Failed to load documents from '{path}': {message}")]
    DocumentLoad {
        /// The offending path.
        path: String,
        /// A description of the failure.
        message: String,
    },
}

impl RagError {
    /// Whether the failed operation may be retried as-is.
    ///
    /// Only transient backend failures qualify. Configuration problems such as
    /// [`RagError::DimensionMismatch`] need operator intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagError::BackendUnavailable { .. }
                | RagError::IndexUnavailable { .. }
                | RagError::Timeout { .. }
        )
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
