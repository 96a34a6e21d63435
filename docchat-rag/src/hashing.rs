//! Offline embedding provider based on feature hashing.
//!
//! [`HashingEmbeddingProvider`] needs no model or network access. Each
//! lowercase alphanumeric token is hashed with FNV-1a into one of
//! `dimensions` buckets and the bucket counts are L2-normalised, so texts
//! sharing words have a high cosine similarity. Useful for demos, tests and
//! air-gapped deployments where lexical matching is good enough.

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A deterministic bag-of-words embedder.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::HashingEmbeddingProvider;
///
/// let provider = HashingEmbeddingProvider::new(256)?;
/// let embedding = provider.embed("Paris is the capital of France").await?;
/// ```
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
}

impl HashingEmbeddingProvider {
    /// Create a provider producing vectors with `dimensions` components.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameters`] if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::InvalidParameters("dimensions must be greater than zero".into()));
        }
        Ok(Self { dimensions })
    }

    fn bucket(&self, token: &str) -> usize {
        let hash = token
            .bytes()
            .fold(FNV_OFFSET, |acc, b| (acc ^ u64::from(b)).wrapping_mul(FNV_PRIME));
        (hash % self.dimensions as u64) as usize
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self { dimensions: 256 }
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let mut tokens = 0usize;
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            embedding[self.bucket(&token.to_lowercase())] += 1.0;
            tokens += 1;
        }

        if tokens == 0 {
            return Err(RagError::InvalidInput {
                provider: "Hashing".into(),
                message: "text contains no alphanumeric tokens".into(),
            });
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        embedding.iter_mut().for_each(|x| *x /= norm);
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
