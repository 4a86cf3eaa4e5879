//! Document chunking.
//!
//! This module provides the [`Chunker`] trait, the [`chunk_text`] function
//! and [`SentenceWindowChunker`], which splits text into overlapping windows
//! of bounded length that prefer to end on a sentence or line break.

use crate::config::RagConfig;

/// A strategy for splitting extracted document text into chunks.
pub trait Chunker: Send + Sync {
    /// Split text into chunk strings, in document order.
    ///
    /// Returns an empty `Vec` if the text is empty or whitespace-only.
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Splits text into overlapping windows of at most `chunk_size` characters.
///
/// A window that does not reach the end of the text is cut right after the
/// last `.` or newline it contains, provided that break lies past the middle
/// of the window. Consecutive windows share `chunk_overlap` characters.
///
/// # Example
///
/// ```rust,ignore
/// use subject_rag::SentenceWindowChunker;
///
/// let chunker = SentenceWindowChunker::new(500, 50);
/// let chunks = chunker.chunk(&text);
/// ```
#[derive(Debug, Clone)]
pub struct SentenceWindowChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SentenceWindowChunker {
    /// Create a new `SentenceWindowChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    /// Create a chunker using the sizes from a [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }
}

impl Chunker for SentenceWindowChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.chunk_size, self.chunk_overlap)
    }
}

/// Split `text` into trimmed chunks of at most `max_size` characters.
///
/// Lengths and positions count `char`s, so multi-byte text is never split
/// inside a character. `overlap` is clamped below `max_size` and every
/// iteration advances by at least one character, so the scan always
/// terminates.
pub fn chunk_text(text: &str, max_size: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || max_size == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let overlap = overlap.min(max_size - 1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = (start + max_size).min(len);

        if end < len {
            let last_break = chars[start..end].iter().rposition(|c| *c == '.' || *c == '\n');
            // Only cut past the midpoint so near-start breaks don't yield tiny chunks.
            if let Some(last_break) = last_break.filter(|b| b * 2 > max_size) {
                end = start + last_break + 1;
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end >= len {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}
