//! # docqa
//!
//! Upload text and PDF documents, index them as embeddings, and ask
//! questions answered from their content.
//!
//! The indexing and retrieval logic lives in the `docqa-core` crate. This
//! crate supplies the concrete capabilities it runs on and the `docqa` CLI:
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌───────────────┐
//! │ LocalFile    │──▶│ DocumentPipeline │──▶│ SqliteIndex   │
//! │ Store (dir)  │   │ chunk + embed    │   │ chunk_vectors │
//! └──────────────┘   └────────┬─────────┘   └───────────────┘
//!                             ▼
//!                    ┌──────────────────┐
//!                    │ OpenAI generator │
//!                    └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and validation |
//! | [`db`] | SQLite connection pool |
//! | [`migrate`] | Index schema |
//! | [`sqlite_index`] | [`VectorIndex`](docqa_core::store::VectorIndex) over SQLite |
//! | [`file_store`] | [`FileStore`](docqa_core::store::FileStore) over a directory |
//! | [`extract`] | Text and PDF extraction |
//! | [`embedding`] | OpenAI, Ollama and local (fastembed) embedders |
//! | [`generator`] | OpenAI chat completions answer generator |
//! | [`retry`] | JSON POST with backoff for the HTTP providers |
//! | [`app`] | Builds a pipeline from config |
//! | [`documents`], [`search`] | CLI commands |

pub mod app;
pub mod config;
pub mod db;
pub mod documents;
pub mod embedding;
pub mod extract;
pub mod file_store;
pub mod generator;
pub mod migrate;
pub mod retry;
pub mod search;
pub mod sqlite_index;
