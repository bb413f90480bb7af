//! Text extraction for stored documents.
//!
//! Plain text is decoded as UTF-8; PDFs go through `pdf-extract`. Failures
//! are returned as [`ExtractionError`], never panics, and the pipeline
//! reports them without touching the index.

use docqa_core::extract::{decode_text, TextExtractor};
use docqa_core::models::DocumentKind;
use docqa_core::ExtractionError;

pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn extract(&self, bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractionError> {
        match kind {
            DocumentKind::Text => decode_text("text document", bytes),
            DocumentKind::Pdf => extract_pdf(bytes),
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    if !bytes.starts_with(b"%PDF") {
        return Err(ExtractionError::Pdf("missing %PDF header".to_string()));
    }
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))
}
