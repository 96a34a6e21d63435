use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use docchat_memory::{InMemoryMemoryStore, MemoryStore};
use docchat_model::OllamaClient;
use docchat_rag::{
    InMemoryVectorStore, IngestReport, IngestionPipeline, OllamaEmbeddingProvider,
    QdrantVectorStore, RagError, Retriever, VectorStore,
};
use docchat_runner::ChatOrchestrator;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::{ServerConfig, VectorStoreKind};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no document location configured (set DOCCHAT_DOCS_LOCATION)")]
    NoLocation,
    #[error(transparent)]
    Failed(#[from] RagError),
}

/// Shared handles behind every request handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ChatOrchestrator,
    pub memory: Arc<dyn MemoryStore>,
    pub pipeline: Arc<IngestionPipeline>,
    pub docs_location: Option<PathBuf>,
    ingest_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        orchestrator: ChatOrchestrator,
        pipeline: Arc<IngestionPipeline>,
        docs_location: Option<PathBuf>,
    ) -> Self {
        Self {
            memory: orchestrator.memory().clone(),
            orchestrator,
            pipeline,
            docs_location,
            ingest_lock: Arc::default(),
        }
    }

    /// Wire up Ollama, the configured vector store and the in-process memory.
    ///
    /// Probes the embedding model once to learn its dimensionality, so Ollama
    /// must be reachable.
    pub async fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let rag_config = config.rag_config()?;

        let embedder = Arc::new(
            OllamaEmbeddingProvider::connect(&config.ollama_url, &config.embedding_model)
                .await
                .with_context(|| format!("connecting to embedding model {}", config.embedding_model))?,
        );
        let store: Arc<dyn VectorStore> = match config.vector_store {
            VectorStoreKind::Memory => Arc::new(InMemoryVectorStore::new()),
            VectorStoreKind::Qdrant => Arc::new(
                QdrantVectorStore::new(&config.qdrant_url)
                    .with_context(|| format!("connecting to qdrant at {}", config.qdrant_url))?,
            ),
        };

        let pipeline = IngestionPipeline::builder()
            .config(rag_config.clone())
            .embedding_provider(embedder.clone())
            .vector_store(store.clone())
            .build()?;
        let retriever = Retriever::new(&rag_config, embedder, store);

        let orchestrator = ChatOrchestrator::builder()
            .retriever(retriever)
            .memory(Arc::new(InMemoryMemoryStore::new(config.memory_window)?))
            .backend(Arc::new(OllamaClient::new(&config.ollama_url, &config.chat_model)))
            .config(config.chat_config()?)
            .build()?;

        info!(
            chat_model = %config.chat_model,
            embedding_model = %config.embedding_model,
            vector_store = ?config.vector_store,
            collection = %rag_config.collection,
            "components ready"
        );
        Ok(Self::new(orchestrator, Arc::new(pipeline), config.docs_location.clone()))
    }

    /// Ingest the configured document location. Runs are serialized.
    pub async fn ingest(&self, full: bool) -> Result<IngestReport, IngestError> {
        let location = self.docs_location.as_deref().ok_or(IngestError::NoLocation)?;
        let _guard = self.ingest_lock.lock().await;
        Ok(self.pipeline.ingest_directory(location, full).await?)
    }
}
