//! Index Manager: the lifecycle of a document's chunk records.
//!
//! The manager owns the mapping from document identity to the set of chunk
//! records stored in the [`VectorIndex`]. After a successful
//! [`IndexManager::process`] the stored set is exactly the set produced by
//! that run: chunks of an older, longer version are removed by document
//! filter, not by id match, so nothing is orphaned.
//!
//! Processing a document:
//!
//! 1. Chunk the text (configuration errors surface before anything else).
//! 2. Embed every chunk in one batched call. A failure here leaves the
//!    index untouched, so the previous version stays searchable.
//! 3. Replace the document's records in the index.
//! 4. Verify the stored count matches the new chunk count.
//!
//! Every step runs under the document's entry in [`DocumentLocks`], so two
//! runs on the same document (or a run racing a delete) never interleave.
//! Callers that read the document's content themselves take the lock first
//! with [`IndexManager::lock`] and hand the guard to
//! [`IndexManager::process_locked`], so a delete cannot slip in between the
//! read and the insert.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::chunk::{build_chunks, sha256_hex};
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::lock::{DocumentGuard, DocumentLocks};
use crate::models::{ChunkConfig, ChunkPayload, DeleteResult, ProcessResult};
use crate::store::{FileStore, IndexRecord, IndexedDocument, VectorIndex};

/// Coordinates chunking, embedding and the vector index for documents.
pub struct IndexManager {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    files: Arc<dyn FileStore>,
    locks: DocumentLocks,
}

impl IndexManager {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            index,
            embedder,
            files,
            locks: DocumentLocks::new(),
        }
    }

    /// Chunk, embed and index `text` as the current content of `document`.
    ///
    /// The fingerprint recorded with each chunk is the SHA-256 of `text`.
    pub async fn process(
        &self,
        document: &str,
        text: &str,
        config: &ChunkConfig,
    ) -> Result<ProcessResult> {
        let fingerprint = sha256_hex(text.as_bytes());
        self.process_with_fingerprint(document, text, &fingerprint, config)
            .await
    }

    /// Like [`process`](Self::process), recording a caller-supplied
    /// fingerprint.
    pub async fn process_with_fingerprint(
        &self,
        document: &str,
        text: &str,
        fingerprint: &str,
        config: &ChunkConfig,
    ) -> Result<ProcessResult> {
        let guard = self.locks.acquire(document).await;
        self.process_locked(&guard, text, fingerprint, config).await
    }

    /// Wait for exclusive access to `document`.
    ///
    /// Processing and deleting the document block until the guard is
    /// dropped.
    pub async fn lock(&self, document: &str) -> DocumentGuard {
        self.locks.acquire(document).await
    }

    /// Process the document held by `guard`, which must come from
    /// [`lock`](Self::lock) on this manager.
    pub async fn process_locked(
        &self,
        guard: &DocumentGuard,
        text: &str,
        fingerprint: &str,
        config: &ChunkConfig,
    ) -> Result<ProcessResult> {
        let document = guard.document();
        let chunks = build_chunks(document, text, config)?;
        if chunks.is_empty() {
            return Err(Error::EmptyContent(document.to_string()));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .embedder
            .embed(&texts)
            .await
            .map_err(|e| Error::Embedding(format!("{:#}", e)))?;
        if vectors.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "expected {} vectors, got {}",
                chunks.len(),
                vectors.len()
            )));
        }
        debug!(document, chunks = chunks.len(), "embedded chunks");

        let model = self.embedder.model_name().to_string();
        let records: Vec<IndexRecord> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexRecord {
                id: chunk.id,
                vector,
                payload: ChunkPayload {
                    document: chunk.document,
                    chunk_index: chunk.chunk_index,
                    text: chunk.text,
                    model: model.clone(),
                    fingerprint: fingerprint.to_string(),
                },
            })
            .collect();

        let previous = self
            .index
            .chunk_ids(document)
            .await
            .map_err(|e| index_error(document, e, false))?;

        let replaced = match self.index.replace_document(document, &records).await {
            Ok(removed) => removed,
            Err(e) => return Err(self.recover(document, &previous, e).await),
        };

        let stored = self
            .index
            .count(document)
            .await
            .map_err(|e| index_error(document, e, false))?;
        if stored != records.len() {
            warn!(document, expected = records.len(), stored, "chunk count mismatch after replace");
            return Err(Error::Index {
                document: Some(document.to_string()),
                message: format!(
                    "{}: expected {} chunk records after replace, found {}",
                    document,
                    records.len(),
                    stored
                ),
                deindexed: stored == 0,
            });
        }

        info!(document, chunks = records.len(), replaced, "processed document");
        Ok(ProcessResult {
            document: document.to_string(),
            chunk_count: records.len(),
            replaced,
        })
    }

    /// Work out what a failed replace left behind.
    ///
    /// If the previous records are still there untouched the document stays
    /// searchable at its old version. Anything else is a partial write: it
    /// is purged so the index never mixes two versions of one document.
    async fn recover(&self, document: &str, previous: &[String], err: anyhow::Error) -> Error {
        let message = format!("{}: {:#}", document, err);

        let current = match self.index.chunk_ids(document).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(document, error = %e, "could not inspect index after failed replace");
                return Error::Index {
                    document: Some(document.to_string()),
                    message,
                    deindexed: true,
                };
            }
        };

        let intact = !previous.is_empty()
            && current.len() == previous.len()
            && current.iter().collect::<HashSet<_>>() == previous.iter().collect::<HashSet<_>>();
        if intact {
            warn!(document, "replace failed, previous chunks left in place");
            return Error::Index {
                document: Some(document.to_string()),
                message,
                deindexed: false,
            };
        }

        if !current.is_empty() {
            if let Err(e) = self.index.delete_ids(&current).await {
                warn!(document, error = %e, "could not purge partial chunks");
            }
        }
        warn!(document, "replace failed, document is no longer indexed");
        Error::Index {
            document: Some(document.to_string()),
            message,
            deindexed: true,
        }
    }

    /// Remove every chunk record of `document`, then its stored file.
    pub async fn delete(&self, document: &str) -> Result<DeleteResult> {
        let _guard = self.locks.acquire(document).await;

        let chunks_deleted = self
            .index
            .delete_document(document)
            .await
            .map_err(|e| index_error(document, e, false))?;
        let file_deleted = self
            .files
            .delete(document)
            .await
            .map_err(|e| Error::Storage(format!("{}: {:#}", document, e)))?;

        info!(document, chunks_deleted, file_deleted, "deleted document");
        Ok(DeleteResult {
            document: document.to_string(),
            chunks_deleted,
            file_deleted,
        })
    }

    /// True iff at least one chunk record exists for `document`.
    pub async fn is_processed(&self, document: &str) -> Result<bool> {
        let count = self
            .index
            .count(document)
            .await
            .map_err(|e| index_error(document, e, false))?;
        Ok(count > 0)
    }

    /// Ids currently stored for `document`, in chunk order.
    pub async fn chunk_ids(&self, document: &str) -> Result<Vec<String>> {
        self.index
            .chunk_ids(document)
            .await
            .map_err(|e| index_error(document, e, false))
    }

    pub async fn describe(&self, document: &str) -> Result<Option<IndexedDocument>> {
        self.index
            .describe(document)
            .await
            .map_err(|e| index_error(document, e, false))
    }

    /// Model name of the embedder chunks are indexed with.
    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }
}

fn index_error(document: &str, err: anyhow::Error, deindexed: bool) -> Error {
    Error::Index {
        document: Some(document.to_string()),
        message: format!("{}: {:#}", document, err),
        deindexed,
    }
}
