//! # Study Copilot CLI (`study`)
//!
//! Ask questions about, summarize, and quiz yourself on a set of PDFs or
//! text notes. Every command builds a fresh in-memory index from the
//! documents it is given.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `study chunks <paths>` | Show how documents would be chunked |
//! | `study ask "<question>" --docs <paths>` | Answer a question from the documents |
//! | `study summarize --docs <paths>` | Produce study notes |
//! | `study mcq --docs <paths>` | Generate multiple-choice questions |
//! | `study serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! study ask "What is Newton's second law?" --docs notes/
//! study ask "What is Newton's second law?" --docs notes/ --baseline
//! study mcq --docs notes/physics.pdf --count 3 --log "higher temperature"
//! RUST_LOG=debug study serve --config ./config/study.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use study_copilot::config;
use study_copilot::server;
use study_copilot::session::StudySession;
use study_copilot::study_cmd::{self, AskArgs};

/// Study Copilot: retrieval-augmented study assistant.
#[derive(Parser)]
#[command(
    name = "study",
    about = "Study Copilot: ask, summarize and quiz over your course material",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/study.toml`; built-in defaults are used when
    /// that file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show per-document chunk counts without calling any model.
    Chunks {
        /// Files or directories to load.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Override `[chunking].chunk_size`.
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Override `[chunking].chunk_overlap`.
        #[arg(long)]
        chunk_overlap: Option<usize>,
    },

    /// Answer a question grounded in the documents.
    Ask {
        /// The question to answer.
        question: String,

        /// Files or directories to load.
        #[arg(long, required = true, num_args = 1..)]
        docs: Vec<PathBuf>,

        /// Use the truncated corpus as context instead of retrieval.
        #[arg(long)]
        baseline: bool,

        /// Number of chunks to retrieve.
        #[arg(long)]
        top_k: Option<usize>,

        /// Sampling temperature (0-2).
        #[arg(long)]
        temperature: Option<f32>,

        /// Record an experiment entry with this observation.
        #[arg(long = "log")]
        log_note: Option<String>,
    },

    /// Summarize the documents as study notes.
    Summarize {
        #[arg(long, required = true, num_args = 1..)]
        docs: Vec<PathBuf>,

        #[arg(long)]
        temperature: Option<f32>,

        #[arg(long = "log")]
        log_note: Option<String>,
    },

    /// Generate multiple-choice questions from the documents.
    Mcq {
        #[arg(long, required = true, num_args = 1..)]
        docs: Vec<PathBuf>,

        /// Number of questions to request.
        #[arg(long, default_value_t = 5)]
        count: usize,

        #[arg(long)]
        temperature: Option<f32>,

        #[arg(long = "log")]
        log_note: Option<String>,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve {
        /// Documents to index before serving.
        #[arg(long, num_args = 1..)]
        docs: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Chunks {
            paths,
            chunk_size,
            chunk_overlap,
        } => {
            study_cmd::run_chunks(&cfg, &paths, chunk_size, chunk_overlap)?;
        }
        Commands::Ask {
            question,
            docs,
            baseline,
            top_k,
            temperature,
            log_note,
        } => {
            study_cmd::run_ask(
                cfg,
                AskArgs {
                    question,
                    docs,
                    baseline,
                    top_k,
                    temperature,
                    log_note,
                },
            )
            .await?;
        }
        Commands::Summarize {
            docs,
            temperature,
            log_note,
        } => {
            study_cmd::run_summary(cfg, &docs, temperature, log_note).await?;
        }
        Commands::Mcq {
            docs,
            count,
            temperature,
            log_note,
        } => {
            study_cmd::run_mcq(cfg, &docs, count, temperature, log_note).await?;
        }
        Commands::Serve { docs } => {
            let session = Arc::new(StudySession::from_config(cfg)?);
            if !docs.is_empty() {
                let report = study_cmd::ingest_paths(&session, &docs).await?;
                println!(
                    "Indexed {} chunks from {} documents.",
                    report.chunks, report.documents
                );
            }
            server::run_server(session).await?;
        }
    }

    Ok(())
}
