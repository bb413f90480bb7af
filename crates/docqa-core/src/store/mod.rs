//! Storage capabilities the pipeline depends on.
//!
//! The [`VectorIndex`] trait covers chunk vectors and their payloads; the
//! [`FileStore`] trait covers the raw uploaded bytes. Both are pluggable:
//! the app crate provides SQLite and local-directory implementations, and
//! [`memory`] provides in-memory ones for tests.
//!
//! Implementations must be `Send + Sync` and internally synchronized.

pub mod memory;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::models::{ChunkPayload, StoredFile};

/// A vector and its payload, keyed by chunk id.
#[derive(Debug, Clone)]
pub struct IndexRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

/// A nearest-neighbour hit.
#[derive(Debug, Clone)]
pub struct IndexHit {
    pub id: String,
    pub payload: ChunkPayload,
    /// Cosine distance to the query vector; lower is closer.
    pub distance: f32,
}

/// Summary of what the index holds for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedDocument {
    pub document: String,
    pub chunk_count: usize,
    /// Embedding model of the document's records.
    pub model: String,
    /// Source fingerprint recorded when the document was processed.
    pub fingerprint: String,
}

/// Abstract vector index.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorIndex::upsert) | Insert or overwrite records by id |
/// | [`delete_ids`](VectorIndex::delete_ids) | Delete records by id |
/// | [`delete_document`](VectorIndex::delete_document) | Delete every record of a document |
/// | [`replace_document`](VectorIndex::replace_document) | Delete-by-document then insert |
/// | [`chunk_ids`](VectorIndex::chunk_ids) | Ids currently stored for a document |
/// | [`describe`](VectorIndex::describe) | Per-document summary |
/// | [`query`](VectorIndex::query) | Nearest-neighbour search |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert records, overwriting any record with the same id.
    async fn upsert(&self, records: &[IndexRecord]) -> Result<()>;

    /// Delete records by id, returning how many existed.
    async fn delete_ids(&self, ids: &[String]) -> Result<usize>;

    /// Delete every record whose payload belongs to `document`.
    async fn delete_document(&self, document: &str) -> Result<usize>;

    /// Ids of the records stored for `document`, in chunk order.
    async fn chunk_ids(&self, document: &str) -> Result<Vec<String>>;

    /// Summary of the records stored for `document`, `None` if there are none.
    async fn describe(&self, document: &str) -> Result<Option<IndexedDocument>>;

    /// The `limit` records closest to `vector`, ascending by distance.
    async fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<IndexHit>>;

    /// Replace all records of `document` with `records`.
    ///
    /// Returns the number of records removed. The default implementation is
    /// not atomic; backends with transactions should override it.
    async fn replace_document(&self, document: &str, records: &[IndexRecord]) -> Result<usize> {
        let removed = self
            .delete_document(document)
            .await
            .context("removing previous chunks")?;
        self.upsert(records).await.with_context(|| {
            format!(
                "inserting {} chunks after removing {}",
                records.len(),
                removed
            )
        })?;
        Ok(removed)
    }

    /// Number of records stored for `document`.
    async fn count(&self, document: &str) -> Result<usize> {
        Ok(self.chunk_ids(document).await?.len())
    }
}

/// Durable byte storage for uploaded documents, keyed by file name.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store `bytes` under `name`, overwriting any existing file.
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<StoredFile>;

    /// Read the bytes stored under `name`.
    async fn read(&self, name: &str) -> Result<Vec<u8>>;

    async fn exists(&self, name: &str) -> Result<bool>;

    /// Delete `name`, returning whether it existed.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// All stored files, sorted by name.
    async fn list(&self) -> Result<Vec<StoredFile>>;
}
