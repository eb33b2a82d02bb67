//! Chunker — splits document text into overlapping passages.
//!
//! Chunk size and overlap are configuration values surfaced to operators,
//! not hidden constants. Offsets are counted in chars so multi-byte text
//! never splits inside a code point.

use crate::types::Locator;

/// Chunking configuration.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Chunk size in chars
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, in chars
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 160,
        }
    }
}

impl ChunkingConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Validate the configuration. Overlap must leave forward progress.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than zero".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }
        Ok(())
    }
}

/// Collapse whitespace runs into single spaces and trim.
pub(crate) fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split normalized text into overlapping chunks.
///
/// Assumes a validated config. Returns an empty vector for empty input.
pub fn split(text: &str, config: &ChunkingConfig) -> Vec<(Locator, String)> {
    let normalized = normalize(text);
    let chars: Vec<char> = normalized.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let step = config.chunk_size - config.chunk_overlap;
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut section = 0u32;

    loop {
        let end = (start + config.chunk_size).min(chars.len());
        let passage: String = chars[start..end].iter().collect();
        chunks.push((
            Locator {
                section,
                start,
                end,
            },
            passage,
        ));

        if end == chars.len() {
            break;
        }
        start += step;
        section += 1;
    }

    chunks
}
