//! Atelier Knowledge — Standards Knowledge Store
//!
//! Embeds and indexes engineering standards documents (ASHRAE, BICSI, ASME
//! excerpts) and answers similarity queries so retrieval-augmented agents can
//! ground their answers in authoritative text instead of model memory.
//!
//! # Architecture
//!
//! ```text
//! (document_id, text) ──► Chunker ──► overlapping passages
//!                                          │
//!                                  EmbeddingProvider
//!                                          │
//!                                  KnowledgeStore (copy-then-swap index)
//!                                          │
//! query(text, k, min_score) ──► cosine ranking ──► ScoredChunks / Citations
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chunker;
pub mod error;
pub mod store;
pub mod types;

pub use chunker::ChunkingConfig;
pub use error::{Error, Result};
pub use store::KnowledgeStore;
pub use types::{Citation, KnowledgeChunk, Locator, ScoredChunk};
