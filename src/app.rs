//! Wiring: builds a [`DocumentPipeline`] from configuration.

use anyhow::Result;
use std::sync::Arc;

use docqa_core::pipeline::DocumentPipeline;

use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::extract::DocumentExtractor;
use crate::file_store::LocalFileStore;
use crate::generator::create_generator;
use crate::migrate;
use crate::sqlite_index::SqliteIndex;

/// Open the index database (creating the schema if needed) and assemble
/// the pipeline with the configured providers.
pub async fn open(config: &Config) -> Result<DocumentPipeline> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;

    let index = Arc::new(SqliteIndex::new(pool));
    let files = Arc::new(LocalFileStore::new(&config.storage.documents_dir));
    let embedder = create_embedder(&config.embedding)?;
    let generator = create_generator(&config.generator)?;

    Ok(DocumentPipeline::new(
        files,
        Arc::new(DocumentExtractor),
        embedder,
        index,
        generator,
        config.pipeline_options()?,
    ))
}
