//! Query-side retrieval: embed → search → filter by threshold.

use std::sync::Arc;

use tracing::{debug, error};

use crate::config::RagConfig;
use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Fetches the stored segments most similar to a query.
///
/// One [`embed`](EmbeddingProvider::embed) call followed by one
/// [`search`](VectorStore::search). Errors from either backend are returned
/// unchanged and never retried here; retry policy belongs to the caller.
#[derive(Clone)]
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    collection: String,
    similarity_threshold: f32,
}

impl Retriever {
    /// Create a retriever over `config.collection`.
    pub fn new(
        config: &RagConfig,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            embedding_provider,
            vector_store,
            collection: config.collection.clone(),
            similarity_threshold: config.similarity_threshold,
        }
    }

    /// The collection this retriever searches.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Return at most `top_k` results ordered by descending relevance.
    ///
    /// Results scoring below the configured similarity threshold are dropped.
    /// An empty index yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameters`] if `top_k` is zero, otherwise
    /// whatever the embedder or vector store reported.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Err(RagError::InvalidParameters("top_k must be greater than zero".into()));
        }

        let query_embedding = self.embedding_provider.embed(query).await.inspect_err(|e| {
            error!(error = %e, "embedding failed during query");
        })?;

        let results = self
            .vector_store
            .search(&self.collection, &query_embedding, top_k)
            .await
            .inspect_err(|e| {
                error!(collection = %self.collection, error = %e, "vector store search failed");
            })?;

        let threshold = self.similarity_threshold;
        let filtered: Vec<SearchResult> =
            results.into_iter().filter(|r| r.score >= threshold).collect();

        debug!(collection = %self.collection, result_count = filtered.len(), "retrieval completed");
        Ok(filtered)
    }
}
