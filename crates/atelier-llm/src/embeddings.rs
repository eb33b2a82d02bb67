//! Embedding providers for vector search
//!
//! The knowledge store treats embedding as black-box similarity: any
//! implementation of `EmbeddingProvider` works. `HashEmbedder` is the
//! built-in local implementation — a deterministic hashed bag-of-words
//! projection that needs no model download and keeps standards text on the
//! machine. Swap in a real sentence-embedding provider behind the same trait
//! for production-quality recall.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Trait for embedding providers
///
/// Embedding providers convert text into dense vector representations
/// suitable for cosine-similarity search.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch processing)
    ///
    /// Default implementation calls `embed` for each text sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Get the embedding dimension
    fn dimensions(&self) -> usize;

    /// Get the provider name
    fn name(&self) -> &str;
}

/// Shared handle to an embedding provider
pub type SharedEmbeddingProvider = Arc<dyn EmbeddingProvider>;

/// Deterministic hashed bag-of-words embedder
///
/// Lowercases, splits on non-alphanumeric boundaries, hashes each term into a
/// fixed-size bucket vector weighted by term frequency, and L2-normalizes.
/// Cosine similarity between two such vectors approximates term overlap,
/// which is enough to rank passages that actually contain the query terms
/// above unrelated ones.
pub struct HashEmbedder {
    dimensions: usize,
}

/// Default bucket count for `HashEmbedder`
const DEFAULT_DIMENSIONS: usize = 512;

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl HashEmbedder {
    /// Create an embedder with the given bucket count
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for term in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = fnv1a(term) as usize % self.dimensions;
            vector[bucket] += 1.0;
        }

        // Dampen high-frequency terms, then L2-normalize
        for weight in &mut vector {
            *weight = weight.sqrt();
        }
        let norm: f32 = vector.iter().map(|w| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for weight in &mut vector {
                *weight /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.dimensions == 0 {
            return Err(Error::Embedding("zero-dimensional embedder".to_string()));
        }
        let vector = self.embed_sync(text);
        debug!(dimensions = vector.len(), "Generated embedding");
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hash-bow"
    }
}

/// FNV-1a hash, 64-bit
fn fnv1a(term: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for byte in term.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
