//! Document commands: `health`, `upload`, `files`, `process`, `status`, `delete`.

use anyhow::{Context, Result};
use std::path::Path;

use crate::app;
use crate::config::Config;

/// Print a short readiness report. Does not touch the index.
pub fn run_health(config: &Config) -> Result<()> {
    let documents_ok = config.storage.documents_dir.is_dir();
    let generator = if config.generator.provider == "disabled" {
        "disabled".to_string()
    } else if std::env::var("OPENAI_API_KEY").map(|k| !k.trim().is_empty()).unwrap_or(false) {
        format!("{} ({})", config.generator.provider, config.generator.model)
    } else {
        "unavailable (OPENAI_API_KEY not set)".to_string()
    };
    let embedding = match (&config.embedding.model, config.embedding.is_enabled()) {
        (_, false) => "disabled".to_string(),
        (Some(model), true) => format!("{} ({})", config.embedding.provider, model),
        (None, true) => config.embedding.provider.clone(),
    };

    println!("status:     ok");
    println!(
        "documents:  {}{}",
        config.storage.documents_dir.display(),
        if documents_ok { "" } else { " (missing, run `docqa init`)" }
    );
    println!("index:      {}", config.index.path.display());
    println!("embedding:  {}", embedding);
    println!("generator:  {}", generator);
    Ok(())
}

/// Create the documents directory and the index schema.
pub async fn run_init(config: &Config) -> Result<()> {
    std::fs::create_dir_all(&config.storage.documents_dir).with_context(|| {
        format!(
            "Failed to create documents directory {}",
            config.storage.documents_dir.display()
        )
    })?;
    crate::migrate::run_migrations(config).await?;
    println!("Initialized docqa.");
    println!("  documents: {}", config.storage.documents_dir.display());
    println!("  index:     {}", config.index.path.display());
    Ok(())
}

pub async fn run_upload(config: &Config, paths: &[std::path::PathBuf]) -> Result<()> {
    let pipeline = app::open(config).await?;
    for path in paths {
        let name = file_name(path)?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let stored = pipeline.upload(&name, &bytes).await?;
        println!("Uploaded {} ({})", stored.name, format_bytes(stored.size));
    }
    Ok(())
}

pub async fn run_files(config: &Config) -> Result<()> {
    let pipeline = app::open(config).await?;
    let documents = pipeline.list_documents().await?;
    if documents.is_empty() {
        println!("No documents.");
        return Ok(());
    }

    let width = documents.iter().map(|d| d.name.len()).max().unwrap_or(4).max(4);
    println!("{:<width$}  {:>10}  {:<12}  CHUNKS", "NAME", "SIZE", "STATUS", width = width);
    for doc in &documents {
        println!(
            "{:<width$}  {:>10}  {:<12}  {}",
            doc.name,
            format_bytes(doc.size),
            doc.status.to_string(),
            doc.chunk_count,
            width = width
        );
    }
    Ok(())
}

pub async fn run_process(
    config: &Config,
    names: &[String],
    chunk_size: Option<usize>,
    overlap: Option<usize>,
) -> Result<()> {
    let chunking = config.chunking.chunk_config(chunk_size, overlap);
    let pipeline = app::open(config).await?;
    for name in names {
        let result = pipeline.process(name, &chunking).await?;
        if result.replaced > 0 {
            println!(
                "Processed {}: {} chunks ({} previous chunks replaced)",
                result.document, result.chunk_count, result.replaced
            );
        } else {
            println!("Processed {}: {} chunks", result.document, result.chunk_count);
        }
    }
    Ok(())
}

pub async fn run_status(config: &Config, name: &str) -> Result<()> {
    let pipeline = app::open(config).await?;
    let doc = pipeline.status(name).await?;
    println!("name:    {}", doc.name);
    println!("kind:    {}", doc.kind.extension());
    println!("size:    {}", format_bytes(doc.size));
    println!("status:  {}", doc.status);
    println!("chunks:  {}", doc.chunk_count);
    Ok(())
}

pub async fn run_delete(config: &Config, name: &str) -> Result<()> {
    let pipeline = app::open(config).await?;
    let result = pipeline.delete(name).await?;
    if result.chunks_deleted == 0 && !result.file_deleted {
        println!("Nothing to delete for {}.", result.document);
    } else {
        println!(
            "Deleted {}: {} chunks removed, file {}",
            result.document,
            result.chunks_deleted,
            if result.file_deleted { "removed" } else { "not found" }
        );
    }
    Ok(())
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .with_context(|| format!("Not a file path: {}", path.display()))
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(16 * 1024 * 1024), "16.0 MB");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Path::new("/tmp/notes.txt")).unwrap(), "notes.txt");
        assert!(file_name(Path::new("/")).is_err());
    }
}
