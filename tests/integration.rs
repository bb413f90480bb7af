//! End-to-end tests over the concrete stack: SQLite index, directory file
//! store and the text/PDF extractor, with a deterministic embedder and
//! generator standing in for the HTTP providers. The CLI tests at the end
//! run the `docqa` binary and never need the network.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use docqa::db;
use docqa::extract::DocumentExtractor;
use docqa::file_store::LocalFileStore;
use docqa::migrate;
use docqa::sqlite_index::SqliteIndex;
use docqa_core::answer::Generator;
use docqa_core::embedding::Embedder;
use docqa_core::models::{ChunkConfig, DocumentStatus};
use docqa_core::pipeline::{DocumentPipeline, PipelineOptions};
use docqa_core::Error;

/// Bag-of-letters embedder, 26 dimensions.
struct LetterEmbedder {
    model: String,
}

#[async_trait]
impl Embedder for LetterEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        26
    }

    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; 26];
                for c in t.chars().filter(|c| c.is_ascii_alphabetic()) {
                    v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
                }
                v
            })
            .collect())
    }
}

struct EchoGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl Generator for EchoGenerator {
    fn model_name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let sources = prompt.matches("[Source: ").count();
        Ok(format!("\n  grounded on {} passages \n", sources))
    }
}

struct Env {
    _tmp: TempDir,
    documents_dir: PathBuf,
    pipeline: DocumentPipeline,
    index: Arc<SqliteIndex>,
    generator: Arc<EchoGenerator>,
}

async fn open_env_at(tmp: TempDir, model: &str) -> Env {
    let documents_dir = tmp.path().join("documents");
    let pool = db::connect_path(&tmp.path().join("data/docqa.sqlite"))
        .await
        .unwrap();
    migrate::apply(&pool).await.unwrap();

    let index = Arc::new(SqliteIndex::new(pool));
    let generator = Arc::new(EchoGenerator {
        calls: AtomicUsize::new(0),
    });
    let pipeline = DocumentPipeline::new(
        Arc::new(LocalFileStore::new(&documents_dir)),
        Arc::new(DocumentExtractor),
        Arc::new(LetterEmbedder {
            model: model.to_string(),
        }),
        index.clone(),
        Some(generator.clone() as Arc<dyn Generator>),
        PipelineOptions::default(),
    );
    Env {
        _tmp: tmp,
        documents_dir,
        pipeline,
        index,
        generator,
    }
}

async fn open_env() -> Env {
    open_env_at(TempDir::new().unwrap(), "letters-v1").await
}

/// Minimal single-page PDF showing `phrase` in Helvetica, with a correct
/// xref table so `pdf-extract` can parse it.
fn minimal_pdf_with_phrase(phrase: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
    let mut out = Vec::new();
    let mut offsets = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    offsets.push(out.len());
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    offsets.push(out.len());
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            content.len(),
            content
        )
        .as_bytes(),
    );
    offsets.push(out.len());
    out.extend_from_slice(b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n");
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

#[tokio::test]
async fn test_upload_process_search_ask_delete() {
    let env = open_env().await;
    let p = &env.pipeline;

    p.upload("cats.txt", b"Cats purr when content. Cats also purr when stressed.")
        .await
        .unwrap();
    p.upload("rust.txt", b"Borrow checker, lifetimes, traits and generics.")
        .await
        .unwrap();
    assert!(env.documents_dir.join("cats.txt").is_file());

    let config = ChunkConfig::new(20, 5);
    let cats = p.process("cats.txt", &config).await.unwrap();
    assert!(cats.chunk_count > 1);
    p.process("rust.txt", &config).await.unwrap();
    assert_eq!(
        env.index.total().await.unwrap(),
        cats.chunk_count + p.indexer().chunk_ids("rust.txt").await.unwrap().len()
    );

    let hits = p.search("cats purr", 3).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].document, "cats.txt");
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));

    let answer = p.ask("Why do cats purr?", 2).await.unwrap();
    assert_eq!(answer.answer, "\n  grounded on 2 passages \n");
    assert_eq!(answer.sources.len(), 2);
    assert_eq!(env.generator.calls.load(Ordering::SeqCst), 1);

    let deleted = p.delete("cats.txt").await.unwrap();
    assert_eq!(deleted.chunks_deleted, cats.chunk_count);
    assert!(deleted.file_deleted);
    assert!(!env.documents_dir.join("cats.txt").exists());
    let hits = p.search("cats purr", 10).await.unwrap();
    assert!(hits.iter().all(|h| h.document == "rust.txt"));
}

#[tokio::test]
async fn test_reprocessing_replaces_chunks_in_sqlite() {
    let env = open_env().await;
    let p = &env.pipeline;
    p.upload("long.txt", "abcdefghij".repeat(10).as_bytes())
        .await
        .unwrap();

    let first = p.process("long.txt", &ChunkConfig::new(10, 0)).await.unwrap();
    assert_eq!(first.chunk_count, 10);
    assert_eq!(first.replaced, 0);

    let second = p.process("long.txt", &ChunkConfig::new(50, 0)).await.unwrap();
    assert_eq!(second.chunk_count, 2);
    assert_eq!(second.replaced, 10);
    assert_eq!(env.index.total().await.unwrap(), 2);

    let again = p.process("long.txt", &ChunkConfig::new(50, 0)).await.unwrap();
    assert_eq!(again.chunk_count, 2);
    assert_eq!(env.index.total().await.unwrap(), 2);
}

#[tokio::test]
async fn test_status_tracks_reupload_and_model_change() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();
    let env = open_env_at(tmp, "letters-v1").await;
    let p = &env.pipeline;

    p.upload("notes.txt", b"first version of the notes")
        .await
        .unwrap();
    assert_eq!(
        p.status("notes.txt").await.unwrap().status,
        DocumentStatus::Unprocessed
    );
    p.process("notes.txt", &ChunkConfig::default()).await.unwrap();
    assert_eq!(
        p.status("notes.txt").await.unwrap().status,
        DocumentStatus::Processed
    );
    assert!(p.is_processed("notes.txt").await.unwrap());

    p.upload("notes.txt", b"second version of the notes")
        .await
        .unwrap();
    assert_eq!(
        p.status("notes.txt").await.unwrap().status,
        DocumentStatus::Stale
    );
    p.process("notes.txt", &ChunkConfig::default()).await.unwrap();

    // Same database and folder, different embedding model.
    let Env { _tmp: tmp, .. } = env;
    assert!(root.join("data/docqa.sqlite").is_file());
    let env = open_env_at(tmp, "letters-v2").await;
    assert_eq!(
        env.pipeline.status("notes.txt").await.unwrap().status,
        DocumentStatus::Stale
    );
    match env.pipeline.search("notes", 3).await {
        Err(Error::ModelMismatch { indexed, current }) => {
            assert_eq!(indexed, "letters-v1");
            assert_eq!(current, "letters-v2");
        }
        other => panic!("expected model mismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_pdf_documents_are_extracted() {
    let env = open_env().await;
    let p = &env.pipeline;

    p.upload("paper.pdf", &minimal_pdf_with_phrase("cats purr loudly"))
        .await
        .unwrap();
    let result = p.process("paper.pdf", &ChunkConfig::default()).await.unwrap();
    assert_eq!(result.chunk_count, 1);

    let hits = p.search("purr", 1).await.unwrap();
    assert_eq!(hits[0].document, "paper.pdf");
    assert!(hits[0].text.contains("cats purr loudly"));
}

#[tokio::test]
async fn test_corrupt_pdf_is_an_extraction_error() {
    let env = open_env().await;
    env.pipeline
        .upload("broken.pdf", b"this is not a pdf")
        .await
        .unwrap();
    let err = env
        .pipeline
        .process("broken.pdf", &ChunkConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "extraction_failed");
    assert_eq!(env.index.total().await.unwrap(), 0);
}

#[tokio::test]
async fn test_list_documents_reads_the_folder() {
    let env = open_env().await;
    let p = &env.pipeline;
    p.upload("b.txt", b"bravo").await.unwrap();
    p.upload("a.txt", b"alpha").await.unwrap();
    p.process("a.txt", &ChunkConfig::default()).await.unwrap();
    // Files with other extensions in the folder are not documents.
    fs::write(env.documents_dir.join("stray.md"), "# ignored").unwrap();

    let docs = p.list_documents().await.unwrap();
    let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
    assert_eq!(docs[0].status, DocumentStatus::Processed);
    assert_eq!(docs[0].chunk_count, 1);
    assert_eq!(docs[1].status, DocumentStatus::Unprocessed);
}

#[tokio::test]
async fn test_upload_name_is_sanitized() {
    let env = open_env().await;
    let stored = env
        .pipeline
        .upload("../../etc/my notes.txt", b"hello")
        .await
        .unwrap();
    assert_eq!(stored.name, "my_notes.txt");
    assert!(env.documents_dir.join("my_notes.txt").is_file());
}

// ============ CLI ============

fn docqa_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // test binary name
    path.pop(); // deps/
    path.push("docqa");
    path
}

/// Temp dir with a config pointing every path inside it. Embedding and
/// generation are disabled so no command reaches the network.
fn setup_cli_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();
    fs::create_dir_all(root.join("config")).unwrap();

    let config = format!(
        r#"[storage]
documents_dir = "{root}/documents"
max_file_size = 64

[index]
path = "{root}/data/docqa.sqlite"

[embedding]
provider = "disabled"

[generator]
provider = "disabled"
"#,
        root = root.display()
    );
    let config_path = root.join("config/docqa.toml");
    fs::write(&config_path, config).unwrap();
    (tmp, config_path)
}

fn docqa(config: &Path, args: &[&str]) -> std::process::Output {
    Command::new(docqa_binary())
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run docqa")
}

#[test]
fn test_cli_init_and_health() {
    let (tmp, config) = setup_cli_env();

    let out = docqa(&config, &["init"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(tmp.path().join("documents").is_dir());
    assert!(tmp.path().join("data/docqa.sqlite").is_file());

    let out = docqa(&config, &["health"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("status:     ok"));
    assert!(stdout.contains("embedding:  disabled"));
    assert!(stdout.contains("generator:  disabled"));
}

#[test]
fn test_cli_upload_files_status_delete() {
    let (tmp, config) = setup_cli_env();
    let source = tmp.path().join("notes.txt");
    fs::write(&source, "cats purr").unwrap();

    let out = docqa(&config, &["upload", source.to_str().unwrap()]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Uploaded notes.txt (9 B)"));

    let out = docqa(&config, &["files"]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("notes.txt"));
    assert!(stdout.contains("unprocessed"));

    let out = docqa(&config, &["status", "notes.txt"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("chunks:  0"));

    let out = docqa(&config, &["delete", "notes.txt"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("file removed"));

    let out = docqa(&config, &["files"]);
    assert!(String::from_utf8_lossy(&out.stdout).contains("No documents."));
}

#[test]
fn test_cli_reports_error_kinds() {
    let (tmp, config) = setup_cli_env();

    let md = tmp.path().join("readme.md");
    fs::write(&md, "# nope").unwrap();
    let out = docqa(&config, &["upload", md.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("error [invalid_type]"));

    let big = tmp.path().join("big.txt");
    fs::write(&big, "x".repeat(65)).unwrap();
    let out = docqa(&config, &["upload", big.to_str().unwrap()]);
    assert!(String::from_utf8_lossy(&out.stderr).contains("error [too_large]"));

    let out = docqa(&config, &["status", "missing.txt"]);
    assert!(String::from_utf8_lossy(&out.stderr).contains("error [not_found]"));

    let small = tmp.path().join("small.txt");
    fs::write(&small, "cats purr").unwrap();
    docqa(&config, &["upload", small.to_str().unwrap()]);
    let out = docqa(&config, &["process", "small.txt"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("error [embedding]"));

    let out = docqa(&config, &["process", "small.txt", "--chunk-size", "10", "--overlap", "10"]);
    assert!(String::from_utf8_lossy(&out.stderr).contains("error [configuration]"));

    let out = docqa(&config, &["ask", "why do cats purr?"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("error [generator_unavailable]"));
}

#[test]
fn test_cli_invalid_config_fails() {
    let (tmp, _) = setup_cli_env();
    let bad = tmp.path().join("config/bad.toml");
    fs::write(&bad, "[chunking]\nsize = 10\noverlap = 20\n").unwrap();
    let out = docqa(&bad, &["health"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("overlap"));
}
