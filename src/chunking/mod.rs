
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, SeedError};

/// Configuration for word-window chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum number of words per chunk
    pub max_words: usize,
    /// Number of words shared between consecutive chunks
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_words: 400,
            overlap: 40,
        }
    }
}

impl ChunkingConfig {
    /// Validate that the window advances on each step.
    ///
    /// `overlap >= max_words` would leave the window stuck at the same
    /// offset forever, so it is rejected up front rather than guarded
    /// mid-loop.
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.max_words == 0 {
            return Err(SeedError::Config(
                "max_words must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.max_words {
            return Err(SeedError::Config(format!(
                "overlap ({}) must be less than max_words ({})",
                self.overlap, self.max_words
            )));
        }
        Ok(())
    }
}

/// Split text into overlapping word windows.
///
/// The text is split on whitespace; each chunk holds up to `max_words`
/// consecutive words rejoined with single spaces, and consecutive chunks
/// share exactly `overlap` words (the final chunk may be shorter and the
/// final pair may share fewer). Every word of the input appears in at least
/// one chunk. Pure function: identical inputs always produce the identical
/// chunk sequence.
#[inline]
pub fn chunk_words(text: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
    config.validate()?;

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let step = config.max_words - config.overlap;
    let mut chunks = Vec::with_capacity(words.len().div_ceil(step));
    let mut offset = 0;

    while offset < words.len() {
        let end = (offset + config.max_words).min(words.len());
        chunks.push(words[offset..end].join(" "));
        // A full window ending on the last word leaves only suffixes of
        // itself for later offsets
        if end == words.len() && end - offset == config.max_words {
            break;
        }
        offset += step;
    }

    debug!(
        "Chunked {} words into {} chunks (max_words={}, overlap={})",
        words.len(),
        chunks.len(),
        config.max_words,
        config.overlap
    );

    Ok(chunks)
}
