//! Ingestion pipeline.
//!
//! The [`IngestionPipeline`] runs the write path: documents are split by a
//! [`Chunker`], embedded in batches by an [`EmbeddingProvider`] and upserted
//! into a [`VectorStore`] under identifiers derived from
//! `(document id, segment ordinal)`. Re-ingesting the same documents
//! therefore overwrites entries instead of duplicating them.
//!
//! # Example
//!
//! ```rust,ignore
//! use docchat_rag::{IngestionPipeline, RagConfig, InMemoryVectorStore};
//!
//! let pipeline = IngestionPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! pipeline.create_collection().await?;
//! let written = pipeline.ingest(&documents).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, Document, Segment, segment_id};
use crate::embedding::{EmbeddingProvider, ensure_dimensions};
use crate::error::{RagError, Result};
use crate::loader::load_documents;
use crate::vectorstore::VectorStore;

/// Summary of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Documents read from the source.
    pub documents: usize,
    /// Segments written to the index.
    pub segments: usize,
    /// Embedding dimensionality of the index.
    pub dimensions: usize,
}

/// Chunk → embed → upsert.
///
/// Construct one via [`IngestionPipeline::builder()`].
pub struct IngestionPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Create the configured collection with the embedder's dimensionality.
    ///
    /// # Errors
    ///
    /// Propagates vector store failures, including
    /// [`RagError::DimensionMismatch`] when the collection already exists
    /// with a different dimensionality.
    pub async fn create_collection(&self) -> Result<()> {
        let dimensions = self.embedding_provider.dimensions();
        let name = &self.config.collection;
        self.vector_store.create_collection(name, dimensions).await.inspect_err(|e| {
            error!(collection = %name, error = %e, "failed to create collection");
        })
    }

    /// Ingest documents and return the number of segments written.
    ///
    /// Segments from all documents are embedded in batches of
    /// `embed_batch_size`; each batch is upserted as soon as it is embedded.
    /// Whitespace-only segments are not indexed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IngestionFailed`] if any batch fails to embed or
    /// upsert. The error carries how many segments were committed and how many
    /// are still pending; calling `ingest` again with the same documents is safe.
    pub async fn ingest(&self, documents: &[Document]) -> Result<usize> {
        let segments = self.segments(documents);
        self.ingest_segments(documents.len(), &segments).await
    }

    fn segments(&self, documents: &[Document]) -> Vec<Segment> {
        documents
            .iter()
            .flat_map(|d| self.chunker.chunk(d))
            // Embedders reject blank input.
            .filter(|s| !s.text.trim().is_empty())
            .collect()
    }

    async fn ingest_segments(&self, document_count: usize, segments: &[Segment]) -> Result<usize> {
        let total = segments.len();
        let collection = &self.config.collection;
        let dimensions = self.embedding_provider.dimensions();
        let mut committed = 0;

        let failed = |committed: usize, source: RagError| RagError::IngestionFailed {
            committed,
            pending: total - committed,
            source: Box::new(source),
        };

        for batch in segments.chunks(self.config.embed_batch_size) {
            let texts: Vec<&str> = batch.iter().map(|s| s.text.as_str()).collect();

            let embeddings = match self.embed_batch(&texts, dimensions).await {
                Ok(embeddings) => embeddings,
                Err(e) => {
                    error!(committed, total, error = %e, "embedding failed during ingestion");
                    return Err(failed(committed, e));
                }
            };

            let chunks: Vec<Chunk> = batch
                .iter()
                .cloned()
                .zip(embeddings)
                .map(|(segment, embedding)| Chunk::from_segment(segment, embedding))
                .collect();

            if let Err(e) = self.vector_store.upsert(collection, &chunks).await {
                error!(committed, total, error = %e, "upsert failed during ingestion");
                return Err(failed(committed, e));
            }

            committed += chunks.len();
            debug!(collection = %collection, committed, total, "upserted batch");
        }

        info!(
            collection = %collection,
            document_count,
            chunk_count = committed,
            "ingested documents"
        );
        Ok(committed)
    }

    /// Ingest `documents`, then remove every other entry from the collection.
    ///
    /// Unlike [`ingest`](Self::ingest) this also removes entries of documents
    /// that are no longer present or now produce fewer segments. The
    /// collection is never dropped: a concurrent search sees the old entries,
    /// the old ones plus upserted batches, or the final set.
    ///
    /// # Errors
    ///
    /// A collection that exists with another dimensionality is
    /// [`RagError::DimensionMismatch`]; switching embedding models needs an
    /// explicit [`VectorStore::delete_collection`] first. Stale entries are
    /// only removed once every batch was upserted.
    pub async fn reindex(&self, documents: &[Document]) -> Result<usize> {
        self.create_collection().await?;
        let segments = self.segments(documents);
        let written = self.ingest_segments(documents.len(), &segments).await?;

        let keep: Vec<String> = segments.iter().map(Segment::stable_id).collect();
        let refs: Vec<&str> = keep.iter().map(String::as_str).collect();
        self.vector_store.retain(&self.config.collection, &refs).await?;
        debug!(collection = %self.config.collection, kept = keep.len(), "pruned stale entries");
        Ok(written)
    }

    /// Load every document below `location` and ingest it.
    ///
    /// With `full` set, entries the run did not produce are pruned via
    /// [`reindex`](Self::reindex).
    pub async fn ingest_directory(&self, location: &Path, full: bool) -> Result<IngestReport> {
        info!(location = %location.display(), "importing documents");
        let documents = load_documents(location).await?;

        let segments = if full {
            self.reindex(&documents).await?
        } else {
            self.create_collection().await?;
            self.ingest(&documents).await?
        };

        let report = IngestReport {
            documents: documents.len(),
            segments,
            dimensions: self.embedding_provider.dimensions(),
        };
        info!(
            documents = report.documents,
            segments = report.segments,
            dimensions = report.dimensions,
            "import finished"
        );
        Ok(report)
    }

    /// Remove the first `segment_count` entries of a document.
    pub async fn delete_document(&self, document_id: &str, segment_count: usize) -> Result<()> {
        let ids: Vec<String> = (0..segment_count).map(|i| segment_id(document_id, i)).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        self.vector_store.delete(&self.config.collection, &refs).await?;
        info!(document.id = document_id, segment_count, "deleted document entries");
        Ok(())
    }

    async fn embed_batch(&self, texts: &[&str], dimensions: usize) -> Result<Vec<Vec<f32>>> {
        let call = self.embedding_provider.embed_batch(texts);
        let embeddings = match self.config.embed_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| RagError::Timeout { stage: "embed", timeout: limit })??,
            None => call.await?,
        };

        if embeddings.len() != texts.len() {
            return Err(RagError::BackendUnavailable {
                provider: "embedding".into(),
                message: format!(
                    "expected {} embeddings, backend returned {}",
                    texts.len(),
                    embeddings.len()
                ),
            });
        }
        for embedding in &embeddings {
            ensure_dimensions(dimensions, embedding)?;
        }
        Ok(embeddings)
    }
}

/// Builder for constructing an [`IngestionPipeline`].
///
/// `embedding_provider` and `vector_store` are required. Without an explicit
/// chunker a [`FixedSizeChunker`] is built from the config's `chunk_size` and
/// `chunk_overlap`.
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl IngestionPipelineBuilder {
    /// Set the pipeline configuration. Defaults to [`RagConfig::default`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`IngestionPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameters`] if a required field is missing
    /// or the configuration is inconsistent.
    pub fn build(self) -> Result<IngestionPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self.embedding_provider.ok_or_else(|| {
            RagError::InvalidParameters("embedding_provider is required".to_string())
        })?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::InvalidParameters("vector_store is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?),
        };

        Ok(IngestionPipeline { config, embedding_provider, vector_store, chunker })
    }
}
