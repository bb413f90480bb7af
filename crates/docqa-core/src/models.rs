//! Core data models used throughout docqa.
//!
//! These types represent the documents, chunk records, and query results
//! that flow through the indexing and retrieval pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Document kinds the extractor understands, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Text,
    Pdf,
}

impl DocumentKind {
    /// Resolve the kind from a file name's extension (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(DocumentKind::Text),
            "pdf" => Some(DocumentKind::Pdf),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Text => "txt",
            DocumentKind::Pdf => "pdf",
        }
    }
}

/// Processing status of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// No chunk records exist for the document.
    Unprocessed,
    /// Chunk records match the stored bytes and the current embedding model.
    Processed,
    /// Chunk records exist but were built from different bytes or a
    /// different embedding model.
    Stale,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocumentStatus::Unprocessed => "unprocessed",
            DocumentStatus::Processed => "processed",
            DocumentStatus::Stale => "stale",
        };
        f.write_str(s)
    }
}

/// A file held by the file store.
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// A stored document together with its indexing status.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub name: String,
    pub size: u64,
    pub kind: DocumentKind,
    pub status: DocumentStatus,
    pub chunk_count: usize,
}

/// Chunking parameters, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    pub size: usize,
    pub overlap: usize,
}

impl ChunkConfig {
    pub fn new(size: usize, overlap: usize) -> Self {
        Self { size, overlap }
    }

    /// Reject configurations whose stride would be non-positive.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::Configuration("chunk size must be > 0".to_string()));
        }
        if self.overlap >= self.size {
            return Err(Error::Configuration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap, self.size
            )));
        }
        Ok(())
    }

    pub fn stride(&self) -> usize {
        self.size - self.overlap
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: 500,
            overlap: 50,
        }
    }
}

/// A chunk of a document's extracted text.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    /// Deterministic id, see [`chunk_id`].
    pub id: String,
    pub document: String,
    pub chunk_index: usize,
    pub text: String,
}

/// Metadata stored alongside each vector in the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkPayload {
    pub document: String,
    pub chunk_index: usize,
    pub text: String,
    /// Embedding model that produced the vector.
    pub model: String,
    /// SHA-256 of the stored document bytes (or text) at processing time.
    pub fingerprint: String,
}

/// A passage returned by a query, with provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedPassage {
    pub text: String,
    pub document: String,
    pub chunk_index: usize,
    /// Cosine distance to the query (`1 - similarity`); lower is closer.
    pub distance: f32,
}

/// A generated answer and the passages it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<RetrievedPassage>,
}

/// Outcome of a successful processing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessResult {
    pub document: String,
    pub chunk_count: usize,
    /// Chunk records removed from the previous processing run.
    pub replaced: usize,
}

/// Outcome of a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteResult {
    pub document: String,
    pub chunks_deleted: usize,
    pub file_deleted: bool,
}

/// Deterministic chunk id for `(document, chunk_index)`.
///
/// A UUIDv5 so the id is accepted by vector stores that require UUID keys,
/// while re-processing the same document overwrites the same ids.
pub fn chunk_id(document: &str, chunk_index: usize) -> String {
    let name = format!("{}#{}", document, chunk_index);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name() {
        assert_eq!(DocumentKind::from_name("notes.txt"), Some(DocumentKind::Text));
        assert_eq!(DocumentKind::from_name("Report.PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_name("archive.tar.gz"), None);
        assert_eq!(DocumentKind::from_name("README"), None);
    }

    #[test]
    fn test_chunk_config_validation() {
        assert!(ChunkConfig::new(5, 0).validate().is_ok());
        assert!(ChunkConfig::new(5, 4).validate().is_ok());
        assert!(matches!(
            ChunkConfig::new(5, 5).validate(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            ChunkConfig::new(0, 0).validate(),
            Err(Error::Configuration(_))
        ));
        assert_eq!(ChunkConfig::default(), ChunkConfig::new(500, 50));
    }

    #[test]
    fn test_chunk_id_deterministic_and_namespaced() {
        assert_eq!(chunk_id("f.txt", 0), chunk_id("f.txt", 0));
        assert_ne!(chunk_id("f.txt", 0), chunk_id("f.txt", 1));
        assert_ne!(chunk_id("f.txt", 0), chunk_id("g.txt", 0));
    }
}
