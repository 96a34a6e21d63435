//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//!
//! Qdrant only accepts UUIDs or integers as point IDs, so each chunk is stored
//! under a UUIDv5 derived from its stable ID and the stable ID itself is kept
//! in the payload.
//!
//! # Example
//!
//! ```rust,ignore
//! use docchat_rag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334")?;
//! store.create_collection("docs", 384).await?;
//! store.upsert("docs", &chunks).await?;
//! let results = store.search("docs", &query_embedding, 5).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfigKind;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    PointStruct, PointsIdsList, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::document::{Chunk, SearchResult};
use crate::embedding::ensure_dimensions;
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, rank};

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Collections use cosine distance. Dimensionality is checked client-side
/// before any request, so mismatches surface as
/// [`RagError::DimensionMismatch`] instead of a transport error. A collection
/// that already exists on the server is usable without
/// [`create_collection`](VectorStore::create_collection); its dimensionality
/// is read from the server on first use.
pub struct QdrantVectorStore {
    client: Qdrant,
    dimensions: RwLock<HashMap<String, usize>>,
}

impl QdrantVectorStore {
    /// Create a new Qdrant vector store connecting to the given URL.
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(Self::map_err)?;
        Ok(Self::from_client(client))
    }

    /// Create a new Qdrant vector store from an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client, dimensions: RwLock::new(HashMap::new()) }
    }

    fn map_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::IndexUnavailable { backend: "qdrant".to_string(), message: e.to_string() }
    }

    /// Extract a string from a Qdrant payload value.
    fn extract_string(value: &QdrantValue) -> Option<String> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        }
    }

    async fn dimensions_of(&self, collection: &str) -> Result<usize> {
        if let Some(dimensions) = self.dimensions.read().await.get(collection) {
            return Ok(*dimensions);
        }

        let info = self.client.collection_info(collection).await.map_err(Self::map_err)?;
        let dimensions = info
            .result
            .and_then(|info| info.config)
            .and_then(|config| config.params)
            .and_then(|params| params.vectors_config)
            .and_then(|vectors| vectors.config)
            .and_then(|config| match config {
                VectorsConfigKind::Params(params) => Some(params.size as usize),
                VectorsConfigKind::ParamsMap(_) => None,
            })
            .ok_or_else(|| RagError::IndexUnavailable {
                backend: "qdrant".to_string(),
                message: format!("collection '{collection}' has no single unnamed vector"),
            })?;

        debug!(collection, dimensions, "opened existing qdrant collection");
        self.dimensions.write().await.insert(collection.to_string(), dimensions);
        Ok(dimensions)
    }

    async fn check(&self, collection: &str, embedding: &[f32]) -> Result<()> {
        let expected = self.dimensions_of(collection).await?;
        ensure_dimensions(expected, embedding)
    }
}

/// The Qdrant point ID for a chunk's stable ID.
pub fn point_id(stable_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, stable_id.as_bytes()).to_string()
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let collections = self.client.list_collections().await.map_err(Self::map_err)?;
        let exists = collections.collections.iter().any(|c| c.name == name);
        if exists {
            debug!(collection = name, "qdrant collection already exists, skipping creation");
        } else {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(name).vectors_config(VectorParamsBuilder::new(
                        dimensions as u64,
                        Distance::Cosine,
                    )),
                )
                .await
                .map_err(Self::map_err)?;
            debug!(collection = name, dimensions, "created qdrant collection");
        }

        self.dimensions.write().await.insert(name.to_string(), dimensions);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let exists = self.client.collection_exists(name).await.map_err(Self::map_err)?;
        if exists {
            self.client.delete_collection(name).await.map_err(Self::map_err)?;
            debug!(collection = name, "deleted qdrant collection");
        }
        self.dimensions.write().await.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        for chunk in chunks {
            self.check(collection, &chunk.embedding).await?;
        }

        let points: Vec<PointStruct> = chunks
            .iter()
            .map(|chunk| {
                let metadata: serde_json::Map<String, serde_json::Value> = chunk
                    .metadata
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect();
                let payload = Payload::try_from(serde_json::json!({
                    "id": chunk.id,
                    "text": chunk.text,
                    "document_id": chunk.document_id,
                    "metadata": metadata,
                }))
                .unwrap_or_default();

                PointStruct::new(point_id(&chunk.id), chunk.embedding.clone(), payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = chunks.len(), "upserted chunks to qdrant");
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let point_ids: Vec<qdrant_client::qdrant::PointId> =
            ids.iter().map(|id| point_id(id).into()).collect();

        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(PointsIdsList { ids: point_ids })
                    .wait(true),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = ids.len(), "deleted points from qdrant");
        Ok(())
    }

    async fn retain(&self, collection: &str, keep: &[&str]) -> Result<()> {
        let keep: Vec<String> = keep.iter().map(|id| id.to_string()).collect();
        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(Filter::must_not([Condition::matches("id", keep)]))
                    .wait(true),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection, "pruned qdrant points outside the kept set");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        self.check(collection, embedding).await?;

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, embedding.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(Self::map_err)?;

        let mut results: Vec<SearchResult> = response
            .result
            .into_iter()
            .map(|scored| {
                let field = |name: &str| {
                    scored.payload.get(name).and_then(Self::extract_string).unwrap_or_default()
                };

                let metadata: HashMap<String, String> = scored
                    .payload
                    .get("metadata")
                    .and_then(|v| match &v.kind {
                        Some(Kind::StructValue(s)) => Some(
                            s.fields
                                .iter()
                                .filter_map(|(k, v)| {
                                    Self::extract_string(v).map(|s| (k.clone(), s))
                                })
                                .collect(),
                        ),
                        _ => None,
                    })
                    .unwrap_or_default();

                SearchResult {
                    chunk: Chunk {
                        id: field("id"),
                        text: field("text"),
                        embedding: vec![],
                        metadata,
                        document_id: field("document_id"),
                    },
                    score: scored.score,
                }
            })
            .collect();

        // Qdrant does not order equal scores deterministically.
        rank(&mut results);
        Ok(results)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(collection).exact(true))
            .await
            .map_err(Self::map_err)?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or_default())
    }
}
