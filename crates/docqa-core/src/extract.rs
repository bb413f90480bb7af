//! Text extraction capability.
//!
//! The pipeline hands stored bytes and their [`DocumentKind`] to a
//! [`TextExtractor`] and indexes whatever text comes back. Binary parsing
//! (PDF) lives in the app crate; plain-text decoding is shared here.

use crate::error::ExtractionError;
use crate::models::DocumentKind;

/// Converts a stored document's raw bytes into a single text string.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractionError>;
}

/// Decode plain-text bytes as UTF-8, stripping a leading byte-order mark.
///
/// `name` is only used in the error message.
pub fn decode_text(name: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|_| ExtractionError::InvalidText(name.to_string()))
}
