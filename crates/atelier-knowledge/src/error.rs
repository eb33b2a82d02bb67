//! Error types for the knowledge store.

/// Errors that can occur in knowledge store operations.
///
/// An empty query result is not an error — "no standards found" is a valid
/// answer and is represented as an empty sequence.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying index or embedder cannot be reached or built
    #[error("knowledge store unavailable: {0}")]
    Unavailable(String),

    /// Rejected ingest input
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

impl From<atelier_llm::Error> for Error {
    fn from(e: atelier_llm::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}

/// Convenience Result type.
pub type Result<T> = std::result::Result<T, Error>;
