//! Error types for atelier-llm

use thiserror::Error;

/// Model invocation error type.
///
/// The three model-call variants (`Unavailable`, `Timeout`, `Refusal`) are the
/// only error kinds that cross the invocation boundary; they map one-to-one
/// onto a task's terminal failure reason and are never collapsed into a
/// default answer.
#[derive(Debug, Error)]
pub enum Error {
    /// Endpoint unreachable
    #[error("model endpoint unreachable: {0}")]
    Unavailable(String),

    /// Configured per-call deadline exceeded
    #[error("model call timed out after {0}ms")]
    Timeout(u64),

    /// Model explicitly declined or returned an error payload
    #[error("model refusal: {0}")]
    Refusal(String),

    /// Client not configured
    #[error("client not configured: {0}")]
    NotConfigured(String),

    /// Embedding provider error
    #[error("embedding error: {0}")]
    Embedding(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
