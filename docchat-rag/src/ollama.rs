//! Ollama embedding provider using the `/api/embed` endpoint.
//!
//! This module is only available when the `ollama` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::embedding::{EmbeddingProvider, ensure_dimensions};
use crate::error::{RagError, Result};

/// The default Ollama server address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Text embedded once at connect time to discover the dimensionality.
const PROBE_TEXT: &str = "test string";

const PROVIDER: &str = "Ollama";

/// An [`EmbeddingProvider`] backed by a local or remote Ollama server.
///
/// Uses `reqwest` to call `POST {base_url}/api/embed` directly. The
/// dimensionality is not configured; [`connect`](Self::connect) embeds a probe
/// string once and fixes [`dimensions()`](EmbeddingProvider::dimensions) to
/// the observed length.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::ollama::OllamaEmbeddingProvider;
///
/// let provider = OllamaEmbeddingProvider::connect("http://localhost:11434", "nomic-embed-text").await?;
/// let embedding = provider.embed("hello world").await?;
/// ```
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaEmbeddingProvider {
    /// Connect to `base_url`, probing `model` for its embedding dimensionality.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::BackendUnavailable`] if the server cannot be reached
    /// and [`RagError::InvalidInput`] if the model is rejected.
    pub async fn connect(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::connect_with_client(reqwest::Client::new(), base_url, model).await
    }

    /// Like [`connect`](Self::connect) but reuses an existing HTTP client.
    pub async fn connect_with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(RagError::InvalidParameters("embedding model must not be empty".into()));
        }
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let mut provider = Self { client, base_url, model, dimensions: 0 };
        let probe = provider.request(&[PROBE_TEXT]).await?;
        provider.dimensions = probe.first().map(Vec::len).unwrap_or_default();
        if provider.dimensions == 0 {
            return Err(RagError::BackendUnavailable {
                provider: PROVIDER.into(),
                message: "probe returned no embedding".into(),
            });
        }

        info!(model = %provider.model, dimensions = provider.dimensions, "embedding dimension");
        Ok(provider)
    }

    /// The model name sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest { model: &self.model, input: texts })
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::BackendUnavailable {
                    provider: PROVIDER.into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);
            error!(provider = PROVIDER, %status, "API error");

            let message = format!("API returned {status}: {detail}");
            return Err(if status.is_client_error() {
                RagError::InvalidInput { provider: PROVIDER.into(), message }
            } else {
                RagError::BackendUnavailable { provider: PROVIDER.into(), message }
            });
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::BackendUnavailable {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(RagError::BackendUnavailable {
                provider: PROVIDER.into(),
                message: format!(
                    "expected {} embeddings, received {}",
                    texts.len(),
                    parsed.embeddings.len()
                ),
            });
        }
        Ok(parsed.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::BackendUnavailable {
            provider: PROVIDER.into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(i) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(RagError::InvalidInput {
                provider: PROVIDER.into(),
                message: format!("input {i} is empty"),
            });
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");
        let embeddings = self.request(texts).await?;
        for embedding in &embeddings {
            ensure_dimensions(self.dimensions, embedding)?;
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
