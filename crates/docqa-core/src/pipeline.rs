//! Document pipeline: the in-process surface of the system.
//!
//! [`DocumentPipeline`] wires the capabilities together:
//!
//! ```text
//! upload ──▶ FileStore
//! process ─▶ FileStore ─▶ TextExtractor ─▶ IndexManager ─▶ VectorIndex
//! search ──▶ Retriever ─▶ VectorIndex
//! ask ─────▶ AnswerAssembler ─▶ Retriever ─▶ Generator
//! delete ──▶ IndexManager ─▶ VectorIndex, FileStore
//! ```
//!
//! Document identity is the sanitized file name (see [`secure_filename`]).

use std::sync::Arc;

use tracing::info;
use unicode_normalization::UnicodeNormalization;

use crate::answer::{AnswerAssembler, Generator};
use crate::chunk::sha256_hex;
use crate::embedding::Embedder;
use crate::error::{Error, ExtractionError, Result};
use crate::extract::TextExtractor;
use crate::index::IndexManager;
use crate::models::{
    Answer, ChunkConfig, DeleteResult, Document, DocumentKind, DocumentStatus, ProcessResult,
    RetrievedPassage, StoredFile,
};
use crate::retrieve::Retriever;
use crate::store::{FileStore, VectorIndex};

/// Upload limits.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Maximum upload size in bytes.
    pub max_file_size: u64,
    /// Document kinds accepted for upload and processing.
    pub allowed_kinds: Vec<DocumentKind>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_file_size: 16 * 1024 * 1024,
            allowed_kinds: vec![DocumentKind::Pdf, DocumentKind::Text],
        }
    }
}

pub struct DocumentPipeline {
    files: Arc<dyn FileStore>,
    extractor: Arc<dyn TextExtractor>,
    indexer: IndexManager,
    retriever: Arc<Retriever>,
    assembler: AnswerAssembler,
    options: PipelineOptions,
}

impl DocumentPipeline {
    pub fn new(
        files: Arc<dyn FileStore>,
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        generator: Option<Arc<dyn Generator>>,
        options: PipelineOptions,
    ) -> Self {
        let indexer = IndexManager::new(index.clone(), embedder.clone(), files.clone());
        let retriever = Arc::new(Retriever::new(index, embedder));
        let assembler = AnswerAssembler::new(retriever.clone(), generator);
        Self {
            files,
            extractor,
            indexer,
            retriever,
            assembler,
            options,
        }
    }

    /// Kind of `name` if its extension is allowed.
    pub fn kind_of(&self, name: &str) -> Result<DocumentKind> {
        DocumentKind::from_name(name)
            .filter(|kind| self.options.allowed_kinds.contains(kind))
            .ok_or_else(|| Error::InvalidType(name.to_string()))
    }

    /// Store an uploaded document under its sanitized name.
    pub async fn upload(&self, name: &str, bytes: &[u8]) -> Result<StoredFile> {
        self.kind_of(name)?;
        let safe = secure_filename(name).ok_or_else(|| Error::InvalidType(name.to_string()))?;
        self.kind_of(&safe)?;

        let size = bytes.len() as u64;
        if size > self.options.max_file_size {
            return Err(Error::TooLarge {
                name: safe,
                size,
                limit: self.options.max_file_size,
            });
        }

        let stored = self
            .files
            .save(&safe, bytes)
            .await
            .map_err(|e| Error::Storage(format!("{}: {:#}", safe, e)))?;
        info!(document = %stored.name, size, "uploaded document");
        Ok(stored)
    }

    /// Every stored document with an allowed extension, by name.
    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        let files = self
            .files
            .list()
            .await
            .map_err(|e| Error::Storage(format!("{:#}", e)))?;
        let mut documents = Vec::new();
        for file in files {
            let kind = match self.kind_of(&file.name) {
                Ok(kind) => kind,
                Err(_) => continue,
            };
            let bytes = self.read(&file.name).await?;
            documents.push(self.document(&file.name, kind, &bytes).await?);
        }
        Ok(documents)
    }

    /// Size, kind and processing status of one document.
    pub async fn status(&self, name: &str) -> Result<Document> {
        let kind = self.kind_of(name)?;
        self.ensure_exists(name).await?;
        let bytes = self.read(name).await?;
        self.document(name, kind, &bytes).await
    }

    /// Extract, chunk, embed and index a stored document, replacing any
    /// chunks from an earlier run.
    ///
    /// The document lock is held from the existence check to the insert, so
    /// a concurrent delete either completes first (and this reports
    /// `NotFound`) or waits and removes the new chunks.
    pub async fn process(&self, name: &str, config: &ChunkConfig) -> Result<ProcessResult> {
        config.validate()?;
        let kind = self.kind_of(name)?;

        let guard = self.indexer.lock(name).await;
        self.ensure_exists(name).await?;
        let bytes = self.read(name).await?;
        let fingerprint = sha256_hex(&bytes);
        let text = self.extract(bytes, kind).await?;
        self.indexer
            .process_locked(&guard, &text, &fingerprint, config)
            .await
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        self.retriever.retrieve(query, k).await
    }

    pub async fn ask(&self, question: &str, k: usize) -> Result<Answer> {
        self.assembler.answer(question, k).await
    }

    /// Remove a document's chunks, then its stored file.
    ///
    /// Deleting an unknown document is not an error; the result reports
    /// that nothing was removed.
    pub async fn delete(&self, name: &str) -> Result<DeleteResult> {
        self.indexer.delete(name).await
    }

    pub async fn is_processed(&self, name: &str) -> Result<bool> {
        self.indexer.is_processed(name).await
    }

    pub fn indexer(&self) -> &IndexManager {
        &self.indexer
    }

    async fn ensure_exists(&self, name: &str) -> Result<()> {
        let exists = self
            .files
            .exists(name)
            .await
            .map_err(|e| Error::Storage(format!("{}: {:#}", name, e)))?;
        if !exists {
            return Err(Error::NotFound(name.to_string()));
        }
        Ok(())
    }

    /// Run the extractor on the blocking pool; PDF parsing is CPU-bound.
    async fn extract(&self, bytes: Vec<u8>, kind: DocumentKind) -> Result<String> {
        let extractor = self.extractor.clone();
        let text = tokio::task::spawn_blocking(move || extractor.extract(&bytes, kind))
            .await
            .map_err(|e| ExtractionError::Failed(format!("extraction task failed: {}", e)))??;
        Ok(text)
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.files
            .read(name)
            .await
            .map_err(|e| Error::Storage(format!("{}: {:#}", name, e)))
    }

    async fn document(&self, name: &str, kind: DocumentKind, bytes: &[u8]) -> Result<Document> {
        let (status, chunk_count) = match self.indexer.describe(name).await? {
            None => (DocumentStatus::Unprocessed, 0),
            Some(summary) => {
                let current = summary.model == self.indexer.model_name()
                    && summary.fingerprint == sha256_hex(bytes);
                let status = if current {
                    DocumentStatus::Processed
                } else {
                    DocumentStatus::Stale
                };
                (status, summary.chunk_count)
            }
        };
        Ok(Document {
            name: name.to_string(),
            size: bytes.len() as u64,
            kind,
            status,
            chunk_count,
        })
    }
}

/// Reduce an uploaded name to a safe flat file name.
///
/// Drops any directory part, NFKD-normalizes so accented letters keep
/// their ASCII base, maps whitespace to `_`, keeps only ASCII letters,
/// digits, `.`, `_` and `-`, and strips leading dots and underscores. Returns `None` if nothing usable remains.
pub fn secure_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .nfkd()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                Some(c)
            } else {
                None
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches(['.', '_']).to_string();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
