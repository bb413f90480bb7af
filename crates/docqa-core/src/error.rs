//! Error taxonomy for the indexing and retrieval pipeline.
//!
//! Every failure the core surfaces carries a [`Error::kind`] string so a
//! caller (CLI, HTTP layer) can render a user-facing message without
//! re-deriving the cause from the capability that failed.

use thiserror::Error;

/// Main error type for docqa core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid chunk size/overlap or result count, rejected before any work.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The document name does not carry an allowed extension.
    #[error("invalid document type: {0}")]
    InvalidType(String),

    /// The document does not exist in the file store.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The upload exceeds the configured size limit.
    #[error("document {name} is {size} bytes, limit is {limit}")]
    TooLarge { name: String, size: u64, limit: u64 },

    /// The stored bytes could not be turned into text.
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// The document's text chunks to nothing.
    #[error("document has no indexable content: {0}")]
    EmptyContent(String),

    /// The embedding capability failed; the index was not touched.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// A vector index operation failed.
    ///
    /// `document` is `None` for query-time failures. `deindexed` is true when
    /// the document was left with no chunk records and must be processed
    /// again to become searchable.
    #[error("index operation failed: {message}")]
    Index {
        document: Option<String>,
        message: String,
        deindexed: bool,
    },

    /// Indexed vectors were produced by a different embedding model.
    #[error("index holds vectors from model '{indexed}', query uses '{current}'; re-process documents")]
    ModelMismatch { indexed: String, current: String },

    /// No answer generator is configured (e.g. missing credential).
    #[error("answer generator unavailable")]
    GeneratorUnavailable,

    /// The answer generator call failed.
    #[error("answer generation failed: {0}")]
    Generation(String),

    /// The file store failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration",
            Error::InvalidType(_) => "invalid_type",
            Error::NotFound(_) => "not_found",
            Error::TooLarge { .. } => "too_large",
            Error::Extraction(_) => "extraction_failed",
            Error::EmptyContent(_) => "empty_content",
            Error::Embedding(_) => "embedding",
            Error::Index { .. } => "index",
            Error::ModelMismatch { .. } => "model_mismatch",
            Error::GeneratorUnavailable => "generator_unavailable",
            Error::Generation(_) => "generation",
            Error::Storage(_) => "storage",
        }
    }
}

/// Text extraction errors.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("{0} is not valid UTF-8 text")]
    InvalidText(String),

    #[error("PDF parse error: {0}")]
    Pdf(String),

    #[error("extraction failed: {0}")]
    Failed(String),
}

/// Result type alias for docqa core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_error_display() {
        let err = Error::Index {
            document: Some("f.txt".to_string()),
            message: "f.txt: disk full".to_string(),
            deindexed: true,
        };
        assert_eq!(err.to_string(), "index operation failed: f.txt: disk full");
        assert_eq!(err.kind(), "index");
    }

    #[test]
    fn test_error_from_extraction_error() {
        let err: Error = ExtractionError::Pdf("bad xref".to_string()).into();
        assert!(matches!(err, Error::Extraction(ExtractionError::Pdf(_))));
        assert_eq!(err.kind(), "extraction_failed");
        assert!(err.to_string().contains("bad xref"));
    }

    #[test]
    fn test_too_large_display() {
        let err = Error::TooLarge {
            name: "big.pdf".to_string(),
            size: 20,
            limit: 10,
        };
        assert_eq!(err.to_string(), "document big.pdf is 20 bytes, limit is 10");
    }

    #[test]
    fn test_kinds_are_distinct() {
        let errors = [
            Error::Configuration(String::new()),
            Error::InvalidType(String::new()),
            Error::NotFound(String::new()),
            Error::EmptyContent(String::new()),
            Error::Embedding(String::new()),
            Error::GeneratorUnavailable,
            Error::Generation(String::new()),
            Error::Storage(String::new()),
        ];
        let mut kinds: Vec<&str> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }
}
