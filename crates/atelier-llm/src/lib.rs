//! Atelier LLM — Model Invocation Boundary
//!
//! This crate provides model integration for Atelier:
//! - Client: the `ModelClient` trait and request/response types
//! - Local: OpenAI-compatible local endpoint provider (LM Studio, Ollama)
//! - Cloud: Anthropic Messages API provider, reserved for the coordinator
//! - Embeddings: `EmbeddingProvider` trait and a deterministic local embedder
//!
//! Everything below the trait is request/response only: prompt text in,
//! text or a structured error kind (Unavailable, Timeout, Refusal) out.
//! No inference happens in this crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod cloud;
pub mod embeddings;
pub mod error;
pub mod local;

pub use client::{ModelClient, ModelRequest, ModelResponse};
pub use cloud::{CloudClient, CloudClientConfig};
pub use embeddings::{EmbeddingProvider, HashEmbedder, SharedEmbeddingProvider};
pub use error::{Error, Result};
pub use local::{LocalClient, LocalClientConfig};
