//! # docchat-rag
//!
//! The ingestion and retrieval half of docchat.
//!
//! ## Overview
//!
//! - [`Chunker`] / [`FixedSizeChunker`] - split documents into overlapping segments
//! - [`EmbeddingProvider`] - turn text into fixed-length vectors
//! - [`VectorStore`] / [`InMemoryVectorStore`] - store and search embeddings
//! - [`IngestionPipeline`] - chunk → embed → upsert, idempotent by segment ID
//! - [`Retriever`] - embed a query and fetch the top-K segments
//! - [`load_documents`] - read a directory tree into [`Document`]s
//!
//! ## Features
//!
//! - `ollama` - [`ollama::OllamaEmbeddingProvider`]
//! - `qdrant` - [`qdrant::QdrantVectorStore`]

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod hashing;
pub mod inmemory;
pub mod loader;
#[cfg(feature = "ollama")]
pub mod ollama;
pub mod pipeline;
#[cfg(feature = "qdrant")]
pub mod qdrant;
pub mod retriever;
pub mod vectorstore;

pub use chunking::{Chunker, FixedSizeChunker, split};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, SearchResult, Segment, segment_id};
pub use embedding::{EmbeddingProvider, cosine_similarity};
pub use error::{RagError, Result};
pub use hashing::HashingEmbeddingProvider;
pub use inmemory::InMemoryVectorStore;
pub use loader::load_documents;
#[cfg(feature = "ollama")]
pub use ollama::OllamaEmbeddingProvider;
pub use pipeline::{IngestReport, IngestionPipeline, IngestionPipelineBuilder};
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
pub use retriever::Retriever;
pub use vectorstore::VectorStore;
