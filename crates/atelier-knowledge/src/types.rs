//! Core types for the knowledge store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a chunk inside its source document.
///
/// `section` is the ordinal chunk index; `start`/`end` are character offsets
/// into the normalized document text. Ordering is derived so ties in query
/// scores break deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Locator {
    /// Ordinal chunk index within the document
    pub section: u32,
    /// Start offset in chars (inclusive)
    pub start: usize,
    /// End offset in chars (exclusive)
    pub end: usize,
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "§{} (chars {}..{})", self.section, self.start, self.end)
    }
}

/// A passage of a standards document.
///
/// Created during indexing, read-only thereafter; a document's chunks are only
/// ever replaced wholesale when the source text is re-ingested.
#[derive(Debug, Clone)]
pub struct KnowledgeChunk {
    /// Source document id
    pub document_id: String,
    /// Position within the document
    pub locator: Locator,
    /// Normalized passage text
    pub text: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
}

/// A chunk paired with its similarity score for a query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The matched passage
    pub chunk: KnowledgeChunk,
    /// Cosine similarity in [0, 1]
    pub score: f32,
}

impl ScoredChunk {
    /// Build the citation a retrieval-augmented agent reports for this match.
    #[must_use]
    pub fn citation(&self) -> Citation {
        Citation {
            document_id: self.chunk.document_id.clone(),
            locator: self.chunk.locator.clone(),
            score: self.score,
        }
    }
}

/// Reference back to authoritative standards text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Source document id
    pub document_id: String,
    /// Position within the document
    pub locator: Locator,
    /// Relevance score in [0, 1]
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_display() {
        let locator = Locator {
            section: 3,
            start: 480,
            end: 1120,
        };
        assert_eq!(locator.to_string(), "§3 (chars 480..1120)");
    }

    #[test]
    fn test_locator_ordering() {
        let a = Locator {
            section: 0,
            start: 0,
            end: 100,
        };
        let b = Locator {
            section: 1,
            start: 80,
            end: 180,
        };
        assert!(a < b);
    }
}
