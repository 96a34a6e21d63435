//! Startup configuration read from `DOCCHAT_*` environment variables.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use docchat_rag::RagConfig;
use docchat_runner::ChatConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid { var: &'static str, value: String, reason: String },
}

/// Where embeddings are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorStoreKind {
    Memory,
    Qdrant,
}

impl FromStr for VectorStoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "qdrant" => Ok(Self::Qdrant),
            other => Err(format!("expected `memory` or `qdrant`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory ingested at startup. Ingestion is skipped when unset.
    pub docs_location: Option<PathBuf>,
    pub ollama_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub vector_store: VectorStoreKind,
    pub qdrant_url: String,
    pub collection: String,
    pub memory_window: usize,
    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Rebuild the collection instead of upserting into it.
    pub reindex: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let rag = RagConfig::default();
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            docs_location: None,
            ollama_url: docchat_rag::ollama::DEFAULT_BASE_URL.to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            chat_model: "llama3".to_string(),
            vector_store: VectorStoreKind::Memory,
            qdrant_url: "http://localhost:6334".to_string(),
            collection: rag.collection,
            memory_window: docchat_memory::DEFAULT_MAX_MESSAGES,
            top_k: ChatConfig::default().top_k,
            chunk_size: rag.chunk_size,
            chunk_overlap: rag.chunk_overlap,
            reindex: false,
        }
    }
}

impl ServerConfig {
    /// Read the process environment. Call `dotenvy::dotenv()` first to pick up
    /// a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a configuration from `lookup`, falling back to defaults for
    /// unset or empty variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(host) = get("DOCCHAT_HOST") {
            config.host = host;
        }
        parse_into(&get, "DOCCHAT_PORT", &mut config.port)?;
        config.docs_location = get("DOCCHAT_DOCS_LOCATION").map(PathBuf::from);
        if let Some(url) = get("DOCCHAT_OLLAMA_URL") {
            config.ollama_url = url;
        }
        if let Some(model) = get("DOCCHAT_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(model) = get("DOCCHAT_CHAT_MODEL") {
            config.chat_model = model;
        }
        parse_into(&get, "DOCCHAT_VECTOR_STORE", &mut config.vector_store)?;
        if let Some(url) = get("DOCCHAT_QDRANT_URL") {
            config.qdrant_url = url;
        }
        if let Some(collection) = get("DOCCHAT_COLLECTION") {
            config.collection = collection;
        }
        parse_into(&get, "DOCCHAT_MEMORY_WINDOW", &mut config.memory_window)?;
        parse_into(&get, "DOCCHAT_TOP_K", &mut config.top_k)?;
        parse_into(&get, "DOCCHAT_CHUNK_SIZE", &mut config.chunk_size)?;
        parse_into(&get, "DOCCHAT_CHUNK_OVERLAP", &mut config.chunk_overlap)?;
        parse_into(&get, "DOCCHAT_REINDEX", &mut config.reindex)?;

        Ok(config)
    }

    pub fn rag_config(&self) -> docchat_rag::Result<RagConfig> {
        RagConfig::builder()
            .collection(self.collection.clone())
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .build()
    }

    pub fn chat_config(&self) -> docchat_runner::Result<ChatConfig> {
        ChatConfig::builder().top_k(self.top_k).build()
    }
}

fn parse_into<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    slot: &mut T,
) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    if let Some(value) = get(var) {
        *slot = value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: value.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.ollama_url, "http://localhost:11434");
        assert_eq!(config.memory_window, 30);
        assert_eq!(config.vector_store, VectorStoreKind::Memory);
        assert!(config.docs_location.is_none());
        assert!(!config.reindex);
    }

    #[test]
    fn reads_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("DOCCHAT_PORT", "9000"),
            ("DOCCHAT_DOCS_LOCATION", "/srv/docs"),
            ("DOCCHAT_VECTOR_STORE", "Qdrant"),
            ("DOCCHAT_MEMORY_WINDOW", "10"),
            ("DOCCHAT_REINDEX", "true"),
            ("DOCCHAT_CHAT_MODEL", "mistral"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.docs_location, Some(PathBuf::from("/srv/docs")));
        assert_eq!(config.vector_store, VectorStoreKind::Qdrant);
        assert_eq!(config.memory_window, 10);
        assert!(config.reindex);
        assert_eq!(config.chat_model, "mistral");
    }

    #[test]
    fn blank_location_counts_as_unset() {
        let config = ServerConfig::from_lookup(lookup(&[("DOCCHAT_DOCS_LOCATION", "  ")])).unwrap();
        assert!(config.docs_location.is_none());
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = ServerConfig::from_lookup(lookup(&[("DOCCHAT_TOP_K", "four")])).unwrap_err();
        assert!(err.to_string().starts_with("DOCCHAT_TOP_K=\"four\" is invalid"));

        let err = ServerConfig::from_lookup(lookup(&[("DOCCHAT_VECTOR_STORE", "faiss")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DOCCHAT_VECTOR_STORE", .. }));
    }

    #[test]
    fn top_k_configures_the_chat_request() {
        let config = ServerConfig::from_lookup(lookup(&[("DOCCHAT_TOP_K", "7")])).unwrap();
        assert_eq!(config.chat_config().unwrap().top_k, 7);
        assert_eq!(ServerConfig::default().top_k, ChatConfig::default().top_k);
    }

    #[test]
    fn inconsistent_chunking_is_rejected() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("DOCCHAT_CHUNK_SIZE", "100"),
            ("DOCCHAT_CHUNK_OVERLAP", "100"),
        ]))
        .unwrap();
        assert!(config.rag_config().is_err());
    }
}
