//! KnowledgeStore — embedded index over standards passages.
//!
//! Ingestion embeds outside the lock and swaps a document's chunk set in one
//! write, so a concurrent query sees either the old set or the new set, never
//! a mix. Queries snapshot the index under a read lock and rank outside it.

use crate::chunker::{self, ChunkingConfig};
use crate::error::{Error, Result};
use crate::types::{KnowledgeChunk, ScoredChunk};
use atelier_llm::EmbeddingProvider;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Similarity-searchable store of standards passages.
pub struct KnowledgeStore {
    embedder: Arc<dyn EmbeddingProvider>,
    chunking: ChunkingConfig,
    index: RwLock<HashMap<String, Arc<Vec<KnowledgeChunk>>>>,
}

impl KnowledgeStore {
    /// Create a store over the given embedder.
    ///
    /// Fails with `Unavailable` if the chunking configuration cannot produce
    /// forward progress (overlap >= size).
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, chunking: ChunkingConfig) -> Result<Self> {
        chunking.validate().map_err(Error::Unavailable)?;
        Ok(Self {
            embedder,
            chunking,
            index: RwLock::new(HashMap::new()),
        })
    }

    /// Ingest a document, replacing any prior chunks for the same id.
    ///
    /// Returns the number of chunks indexed. The replacement is atomic with
    /// respect to `query`: embedding happens before the write lock is taken.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn ingest(&self, document_id: &str, text: &str) -> Result<usize> {
        if document_id.is_empty() {
            return Err(Error::InvalidDocument("empty document id".to_string()));
        }

        let pieces = chunker::split(text, &self.chunking);
        let texts: Vec<String> = pieces.iter().map(|(_, t)| t.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let chunks: Vec<KnowledgeChunk> = pieces
            .into_iter()
            .zip(embeddings)
            .map(|((locator, text), embedding)| KnowledgeChunk {
                document_id: document_id.to_string(),
                locator,
                text,
                embedding,
            })
            .collect();

        let count = chunks.len();
        let mut index = self.index.write().await;
        index.insert(document_id.to_string(), Arc::new(chunks));
        drop(index);

        info!(document_id, chunks = count, "Document ingested");
        Ok(count)
    }

    /// Remove a document and all its chunks. Returns true if it existed.
    pub async fn remove(&self, document_id: &str) -> bool {
        self.index.write().await.remove(document_id).is_some()
    }

    /// Query the store for passages similar to `text`.
    ///
    /// Returns up to `k` chunks with score >= `min_score`, ordered by
    /// descending score; ties break by (document_id, locator) so results are
    /// deterministic. An empty result is a valid answer, not an error.
    #[instrument(skip(self, text))]
    pub async fn query(&self, text: &str, k: usize, min_score: f32) -> Result<Vec<ScoredChunk>> {
        let query_embedding = self.embedder.embed(text).await?;

        // Snapshot under the read lock, score outside it
        let snapshot: Vec<Arc<Vec<KnowledgeChunk>>> = {
            let index = self.index.read().await;
            index.values().cloned().collect()
        };

        let mut scored: Vec<ScoredChunk> = Vec::new();
        for chunks in &snapshot {
            for chunk in chunks.iter() {
                let score = cosine(&query_embedding, &chunk.embedding);
                if score >= min_score {
                    scored.push(ScoredChunk {
                        chunk: chunk.clone(),
                        score,
                    });
                }
            }
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    (&a.chunk.document_id, &a.chunk.locator)
                        .cmp(&(&b.chunk.document_id, &b.chunk.locator))
                })
        });
        scored.truncate(k);

        debug!(results = scored.len(), "Knowledge query complete");
        Ok(scored)
    }

    /// List ingested documents with their chunk counts.
    pub async fn documents(&self) -> Vec<(String, usize)> {
        let index = self.index.read().await;
        let mut docs: Vec<(String, usize)> = index
            .iter()
            .map(|(id, chunks)| (id.clone(), chunks.len()))
            .collect();
        docs.sort();
        docs
    }

    /// The chunking configuration in effect.
    #[must_use]
    pub fn chunking(&self) -> &ChunkingConfig {
        &self.chunking
    }
}

/// Cosine similarity; 0.0 when either vector has zero norm.
fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
