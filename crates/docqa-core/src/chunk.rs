//! Overlapping fixed-window text chunker.
//!
//! Splits extracted document text into windows of `size` characters that
//! advance by `size - overlap`. Consecutive windows share exactly `overlap`
//! characters so no sentence is lost at a boundary; naive concatenation of
//! the chunks therefore duplicates the overlapping spans.
//!
//! # Algorithm
//!
//! 1. Validate the [`ChunkConfig`] (`size > 0`, `overlap < size`).
//! 2. Walk the text by `char` (never by byte, so windows never split a
//!    UTF-8 sequence), starting a window every `size - overlap` chars.
//! 3. Emit a window untrimmed if it has any non-whitespace content.
//! 4. Stop after the first window that reaches the end of the text. The
//!    final window may be shorter than `size`.
//!
//! For a text of `L` chars this produces `ceil((L - O) / (S - O))` windows
//! when `L > O`, one window when `0 < L <= O`, and none when `L = 0`,
//! before whitespace-only windows are dropped.
//!
//! # Example
//!
//! ```rust
//! use docqa_core::chunk::chunk_text;
//! use docqa_core::models::ChunkConfig;
//!
//! let chunks = chunk_text("AAAAABBBBBCCCCC", &ChunkConfig::new(5, 0)).unwrap();
//! assert_eq!(chunks, vec!["AAAAA", "BBBBB", "CCCCC"]);
//! ```

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::{chunk_id, ChunkConfig, ChunkRecord};

/// Split `text` into overlapping windows.
///
/// Returns windows in start order. Fails with
/// [`Error::Configuration`](crate::error::Error::Configuration) before
/// looking at the text if the config is invalid.
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Result<Vec<String>> {
    config.validate()?;

    // Byte offset of every char boundary, including the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = bounds.len() - 1;

    let mut chunks = Vec::new();
    if len == 0 {
        return Ok(chunks);
    }

    let stride = config.stride();
    let mut start = 0usize;
    loop {
        let end = (start + config.size).min(len);
        let window = &text[bounds[start]..bounds[end]];
        if !window.trim().is_empty() {
            chunks.push(window.to_string());
        }
        if end >= len {
            break;
        }
        start += stride;
    }

    Ok(chunks)
}

/// Chunk a document's text into [`ChunkRecord`]s.
///
/// Indices are contiguous from 0 in window order and ids are derived from
/// `(document, index)`, so re-chunking identical text yields identical
/// records.
pub fn build_chunks(document: &str, text: &str, config: &ChunkConfig) -> Result<Vec<ChunkRecord>> {
    let windows = chunk_text(text, config)?;
    Ok(windows
        .into_iter()
        .enumerate()
        .map(|(index, window)| make_chunk(document, index, window))
        .collect())
}

/// SHA-256 hex digest of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn make_chunk(document: &str, index: usize, text: String) -> ChunkRecord {
    ChunkRecord {
        id: chunk_id(document, index),
        document: document.to_string(),
        chunk_index: index,
        text,
    }
}
