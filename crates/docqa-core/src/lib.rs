//! # docqa core
//!
//! Document indexing and retrieval logic for docqa: chunking, the index
//! lifecycle (insert, replace on re-process, delete), query-time
//! retrieval and grounded answer assembly.
//!
//! Everything outside that logic is a capability trait the caller
//! provides: [`store::FileStore`], [`extract::TextExtractor`],
//! [`embedding::Embedder`], [`store::VectorIndex`] and
//! [`answer::Generator`]. This crate has no filesystem, SQL or HTTP code;
//! [`store::memory`] holds in-memory implementations of the stores.

pub mod answer;
pub mod chunk;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod lock;
pub mod models;
pub mod pipeline;
pub mod retrieve;
pub mod store;

pub use error::{Error, ExtractionError, Result};
