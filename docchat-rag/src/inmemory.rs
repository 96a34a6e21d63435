//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency vector store
//! backed by a `HashMap` protected by a `tokio::sync::RwLock`. It is suitable
//! for development, testing, and small-scale use cases.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{Chunk, SearchResult};
use crate::embedding::{cosine_similarity, ensure_dimensions};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, rank};

#[derive(Debug)]
struct Collection {
    dimensions: usize,
    chunks: HashMap<String, Chunk>,
}

/// An in-memory vector store using cosine similarity for search.
///
/// Collections are stored as nested `HashMap`s: collection name → chunk ID → chunk.
/// Readers never wait on an embedding call; they only contend with the brief
/// write lock taken while an upsert batch is inserted, so a concurrent search
/// sees either the state before or after that batch.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(collection: &str) -> RagError {
    RagError::IndexUnavailable {
        backend: "InMemory".to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        if let Some(existing) = collections.get(name) {
            if existing.dimensions != dimensions {
                return Err(RagError::DimensionMismatch {
                    expected: existing.dimensions,
                    actual: dimensions,
                });
            }
            return Ok(());
        }
        collections.insert(name.to_string(), Collection { dimensions, chunks: HashMap::new() });
        debug!(collection = name, dimensions, "created in-memory collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        // Validate the whole batch first so a bad vector never leaves it half-applied.
        for chunk in chunks {
            ensure_dimensions(store.dimensions, &chunk.embedding)?;
        }
        for chunk in chunks {
            store.chunks.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        for id in ids {
            store.chunks.remove(*id);
        }
        Ok(())
    }

    async fn retain(&self, collection: &str, keep: &[&str]) -> Result<()> {
        let keep: HashSet<&str> = keep.iter().copied().collect();
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        let before = store.chunks.len();
        store.chunks.retain(|id, _| keep.contains(id.as_str()));
        debug!(collection, removed = before - store.chunks.len(), "pruned in-memory collection");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;
        ensure_dimensions(store.dimensions, embedding)?;

        let mut scored: Vec<SearchResult> = store
            .chunks
            .values()
            .map(|chunk| {
                let score = cosine_similarity(&chunk.embedding, embedding);
                SearchResult { chunk: chunk.clone(), score }
            })
            .collect();

        rank(&mut scored);
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;
        Ok(store.chunks.len())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            text: format!("text of {id}"),
            embedding,
            metadata: HashMap::new(),
            document_id: "doc".to_string(),
        }
    }

    #[tokio::test]
    async fn empty_collection_returns_no_results() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        assert!(store.search("docs", &[1.0, 0.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        store.upsert("docs", &[chunk("a", vec![1.0, 0.0])]).await.unwrap();
        store.upsert("docs", &[chunk("a", vec![0.0, 1.0])]).await.unwrap();

        assert_eq!(store.count("docs").await.unwrap(), 1);
        let results = store.search("docs", &[0.0, 1.0], 1).await.unwrap();
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn ties_are_broken_by_id() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        store
            .upsert(
                "docs",
                &[chunk("b", vec![1.0, 0.0]), chunk("c", vec![1.0, 0.0]), chunk("a", vec![1.0, 0.0])],
            )
            .await
            .unwrap();

        let ids: Vec<String> = store
            .search("docs", &[1.0, 0.0], 3)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.chunk.id)
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn mismatched_dimensions_are_rejected() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 3).await.unwrap();

        let upsert = store.upsert("docs", &[chunk("a", vec![1.0, 0.0])]).await;
        assert!(matches!(upsert, Err(RagError::DimensionMismatch { expected: 3, actual: 2 })));
        assert_eq!(store.count("docs").await.unwrap(), 0);

        let search = store.search("docs", &[1.0], 1).await;
        assert!(matches!(search, Err(RagError::DimensionMismatch { expected: 3, actual: 1 })));

        let recreate = store.create_collection("docs", 4).await;
        assert!(matches!(recreate, Err(RagError::DimensionMismatch { .. })));
    }

    #[tokio::test]
    async fn delete_removes_entries() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        store
            .upsert("docs", &[chunk("a", vec![1.0, 0.0]), chunk("b", vec![0.0, 1.0])])
            .await
            .unwrap();
        store.delete("docs", &["a", "missing"]).await.unwrap();
        assert_eq!(store.count("docs").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn retain_keeps_only_listed_ids() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        store
            .upsert(
                "docs",
                &[chunk("a", vec![1.0, 0.0]), chunk("b", vec![0.0, 1.0]), chunk("c", vec![1.0, 1.0])],
            )
            .await
            .unwrap();

        store.retain("docs", &["b", "gone"]).await.unwrap();
        let ids: Vec<String> =
            store.search("docs", &[0.0, 1.0], 5).await.unwrap().into_iter().map(|r| r.chunk.id).collect();
        assert_eq!(ids, ["b"]);

        store.retain("docs", &[]).await.unwrap();
        assert_eq!(store.count("docs").await.unwrap(), 0);
        assert!(store.search("docs", &[1.0, 0.0], 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_collection_is_an_error() {
        let store = InMemoryVectorStore::new();
        assert!(store.search("nope", &[1.0], 1).await.is_err());
    }
}
