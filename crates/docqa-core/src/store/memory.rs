//! In-memory [`VectorIndex`] and [`FileStore`] implementations.
//!
//! Uses `HashMap` behind `std::sync::RwLock`. Nearest-neighbour search is
//! brute-force cosine distance over all stored vectors. Useful for tests
//! and for embedding the pipeline without SQLite.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::embedding::cosine_distance;
use crate::models::{ChunkPayload, StoredFile};

use super::{FileStore, IndexHit, IndexRecord, IndexedDocument, VectorIndex};

struct StoredVector {
    vector: Vec<f32>,
    payload: ChunkPayload,
}

/// In-memory vector index.
pub struct InMemoryIndex {
    vectors: RwLock<HashMap<String, StoredVector>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            vectors: RwLock::new(HashMap::new()),
        }
    }

    /// Total number of records across all documents.
    pub fn len(&self) -> usize {
        self.vectors.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, records: &[IndexRecord]) -> Result<()> {
        let mut vectors = self.vectors.write().map_err(poisoned)?;
        for r in records {
            vectors.insert(
                r.id.clone(),
                StoredVector {
                    vector: r.vector.clone(),
                    payload: r.payload.clone(),
                },
            );
        }
        debug!("upserted {} records", records.len());
        Ok(())
    }

    async fn delete_ids(&self, ids: &[String]) -> Result<usize> {
        let mut vectors = self.vectors.write().map_err(poisoned)?;
        Ok(ids.iter().filter(|id| vectors.remove(*id).is_some()).count())
    }

    async fn delete_document(&self, document: &str) -> Result<usize> {
        let mut vectors = self.vectors.write().map_err(poisoned)?;
        let before = vectors.len();
        vectors.retain(|_, sv| sv.payload.document != document);
        Ok(before - vectors.len())
    }

    async fn chunk_ids(&self, document: &str) -> Result<Vec<String>> {
        let vectors = self.vectors.read().map_err(poisoned)?;
        let mut ids: Vec<(usize, String)> = vectors
            .iter()
            .filter(|(_, sv)| sv.payload.document == document)
            .map(|(id, sv)| (sv.payload.chunk_index, id.clone()))
            .collect();
        ids.sort();
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    async fn describe(&self, document: &str) -> Result<Option<IndexedDocument>> {
        let vectors = self.vectors.read().map_err(poisoned)?;
        let mut matching = vectors
            .values()
            .filter(|sv| sv.payload.document == document)
            .peekable();
        let first = match matching.peek() {
            Some(sv) => (sv.payload.model.clone(), sv.payload.fingerprint.clone()),
            None => return Ok(None),
        };
        Ok(Some(IndexedDocument {
            document: document.to_string(),
            chunk_count: matching.count(),
            model: first.0,
            fingerprint: first.1,
        }))
    }

    async fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<IndexHit>> {
        let vectors = self.vectors.read().map_err(poisoned)?;
        let mut hits: Vec<IndexHit> = vectors
            .iter()
            .map(|(id, sv)| IndexHit {
                id: id.clone(),
                payload: sv.payload.clone(),
                distance: cosine_distance(vector, &sv.vector),
            })
            .collect();
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.payload.document.cmp(&b.payload.document))
                .then_with(|| a.payload.chunk_index.cmp(&b.payload.chunk_index))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

/// In-memory file store.
pub struct InMemoryFileStore {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for InMemoryFileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<StoredFile> {
        let mut files = self.files.write().map_err(poisoned)?;
        files.insert(name.to_string(), bytes.to_vec());
        Ok(StoredFile {
            name: name.to_string(),
            size: bytes.len() as u64,
            modified: Some(Utc::now()),
        })
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let files = self.files.read().map_err(poisoned)?;
        files
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("file not found: {}", name))
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.files.read().map_err(poisoned)?.contains_key(name))
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.files.write().map_err(poisoned)?.remove(name).is_some())
    }

    async fn list(&self) -> Result<Vec<StoredFile>> {
        let files = self.files.read().map_err(poisoned)?;
        Ok(files
            .iter()
            .map(|(name, bytes)| StoredFile {
                name: name.clone(),
                size: bytes.len() as u64,
                modified: None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(document: &str, index: usize, vector: Vec<f32>) -> IndexRecord {
        IndexRecord {
            id: crate::models::chunk_id(document, index),
            vector,
            payload: ChunkPayload {
                document: document.to_string(),
                chunk_index: index,
                text: format!("{} chunk {}", document, index),
                model: "test-model".to_string(),
                fingerprint: "fp".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_id() {
        let index = InMemoryIndex::new();
        index.upsert(&[record("a.txt", 0, vec![1.0, 0.0])]).await.unwrap();
        index.upsert(&[record("a.txt", 0, vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(index.len(), 1);
        let hits = index.query(&[0.0, 1.0], 5).await.unwrap();
        assert!(hits[0].distance.abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_delete_document_only_touches_that_document() {
        let index = InMemoryIndex::new();
        index
            .upsert(&[
                record("a.txt", 0, vec![1.0, 0.0]),
                record("a.txt", 1, vec![1.0, 1.0]),
                record("b.txt", 0, vec![0.0, 1.0]),
            ])
            .await
            .unwrap();
        assert_eq!(index.delete_document("a.txt").await.unwrap(), 2);
        assert_eq!(index.count("a.txt").await.unwrap(), 0);
        assert_eq!(index.count("b.txt").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_query_orders_by_ascending_distance() {
        let index = InMemoryIndex::new();
        index
            .upsert(&[
                record("a.txt", 0, vec![0.0, 1.0]),
                record("a.txt", 1, vec![1.0, 0.1]),
                record("a.txt", 2, vec![1.0, 1.0]),
            ])
            .await
            .unwrap();
        let hits = index.query(&[1.0, 0.0], 3).await.unwrap();
        let order: Vec<usize> = hits.iter().map(|h| h.payload.chunk_index).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));

        let top = index.query(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn test_describe_and_chunk_ids() {
        let index = InMemoryIndex::new();
        assert!(index.describe("a.txt").await.unwrap().is_none());
        index
            .upsert(&[record("a.txt", 1, vec![1.0]), record("a.txt", 0, vec![1.0])])
            .await
            .unwrap();
        let summary = index.describe("a.txt").await.unwrap().unwrap();
        assert_eq!(summary.chunk_count, 2);
        assert_eq!(summary.model, "test-model");
        let ids = index.chunk_ids("a.txt").await.unwrap();
        assert_eq!(
            ids,
            vec![crate::models::chunk_id("a.txt", 0), crate::models::chunk_id("a.txt", 1)]
        );
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let files = InMemoryFileStore::new();
        files.save("b.txt", b"bee").await.unwrap();
        files.save("a.txt", b"ay").await.unwrap();
        assert!(files.exists("a.txt").await.unwrap());
        assert_eq!(files.read("b.txt").await.unwrap(), b"bee");
        let names: Vec<String> = files.list().await.unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert!(files.delete("a.txt").await.unwrap());
        assert!(!files.delete("a.txt").await.unwrap());
        assert!(files.read("a.txt").await.is_err());
    }
}
