//! # docqa CLI
//!
//! ```bash
//! docqa init                          # create documents dir and index
//! docqa upload notes.txt paper.pdf    # store documents
//! docqa files                         # list documents and their status
//! docqa process notes.txt             # chunk, embed and index
//! docqa search "purring"              # nearest passages
//! docqa ask "Why do cats purr?"       # grounded answer with sources
//! docqa delete notes.txt              # remove file and its chunks
//! ```
//!
//! Errors from the pipeline are printed as `error [<kind>]: <message>` and
//! exit with status 1.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docqa::{config, documents, search};

/// docqa: ask questions about your documents.
#[derive(Parser)]
#[command(
    name = "docqa",
    version,
    about = "Upload text and PDF documents, index them, and ask questions about them"
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docqa.toml`, or built-in defaults when that
    /// file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the documents directory and the index database.
    Init,

    /// Report readiness and the configured providers.
    Health,

    /// Store one or more .txt or .pdf files.
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List stored documents with their processing status.
    Files,

    /// Chunk, embed and index stored documents.
    ///
    /// Re-processing a document replaces its previous chunks.
    Process {
        #[arg(required = true)]
        names: Vec<String>,

        /// Chunk size in characters.
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Characters shared between consecutive chunks.
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Show the status of one document.
    Status { name: String },

    /// Return the passages closest to a query.
    Search {
        query: String,

        /// Number of passages.
        #[arg(short, long)]
        k: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Answer a question from the indexed documents.
    Ask {
        question: String,

        /// Number of passages used as context.
        #[arg(short, long)]
        k: Option<usize>,

        /// Print the answer as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete a document and all of its chunks.
    Delete { name: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<docqa_core::Error>() {
            Some(err) => eprintln!("error [{}]: {}", err.kind(), err),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = config::load_config_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => documents::run_init(&cfg).await?,
        Commands::Health => documents::run_health(&cfg)?,
        Commands::Upload { paths } => documents::run_upload(&cfg, &paths).await?,
        Commands::Files => documents::run_files(&cfg).await?,
        Commands::Process {
            names,
            chunk_size,
            overlap,
        } => documents::run_process(&cfg, &names, chunk_size, overlap).await?,
        Commands::Status { name } => documents::run_status(&cfg, &name).await?,
        Commands::Search { query, k, json } => search::run_search(&cfg, &query, k, json).await?,
        Commands::Ask { question, k, json } => search::run_ask(&cfg, &question, k, json).await?,
        Commands::Delete { name } => documents::run_delete(&cfg, &name).await?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
