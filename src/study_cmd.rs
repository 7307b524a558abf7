//! CLI command implementations.
//!
//! Each `study` subcommand loads documents from disk, builds a fresh
//! in-memory index (nothing persists between runs), runs one task and
//! prints the result to stdout.

use anyhow::{bail, Result};
use serde_json::Value;
use std::path::PathBuf;

use study_copilot_core::chunk::chunk_document;
use study_copilot_core::models::AnswerMode;

use crate::config::Config;
use crate::documents::load_documents;
use crate::experiment::{ParamValue, Params};
use crate::session::{AskOptions, IngestReport, StudySession};

/// Print per-document chunk counts. Needs no embedding or generation service.
pub fn run_chunks(
    config: &Config,
    paths: &[PathBuf],
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
) -> Result<()> {
    let mut options = config.chunking.to_options();
    if let Some(size) = chunk_size {
        options.chunk_size = size;
    }
    if let Some(overlap) = chunk_overlap {
        options.chunk_overlap = overlap;
    }

    let loaded = load_documents(paths, &config.documents)?;
    if loaded.documents.is_empty() {
        bail!("No documents with extractable text found");
    }

    println!(
        "Chunking with size {} and overlap {}:",
        options.effective_chunk_size(),
        options.effective_overlap()
    );
    let mut total = 0;
    for doc in &loaded.documents {
        let chunks = chunk_document(&doc.text, &options, Some(&doc.name));
        let longest = chunks
            .iter()
            .map(|c| c.metadata.char_length)
            .max()
            .unwrap_or(0);
        println!(
            "  {}: {} chunks (longest {} chars)",
            doc.name,
            chunks.len(),
            longest
        );
        total += chunks.len();
    }
    for name in &loaded.skipped {
        println!("  {}: skipped", name);
    }
    println!("Total: {} chunks from {} documents", total, loaded.documents.len());
    Ok(())
}

/// Load `paths` and index them into `session`.
pub async fn ingest_paths(session: &StudySession, paths: &[PathBuf]) -> Result<IngestReport> {
    let config = session.config();
    let loaded = load_documents(paths, &config.documents)?;
    if loaded.documents.is_empty() {
        bail!("No documents with extractable text found");
    }
    let mut report = session
        .ingest(loaded.documents, &config.chunking.to_options())
        .await?;
    report.skipped.extend(loaded.skipped);
    Ok(report)
}

pub struct AskArgs {
    pub question: String,
    pub docs: Vec<PathBuf>,
    pub baseline: bool,
    pub top_k: Option<usize>,
    pub temperature: Option<f32>,
    pub log_note: Option<String>,
}

pub async fn run_ask(config: Config, args: AskArgs) -> Result<()> {
    let session = StudySession::from_config(config)?;
    let report = ingest_paths(&session, &args.docs).await?;
    println!(
        "Indexed {} chunks from {} documents.\n",
        report.chunks, report.documents
    );

    let mode = if args.baseline {
        AnswerMode::Baseline
    } else {
        AnswerMode::Rag
    };
    let options = AskOptions {
        mode,
        top_k: args.top_k,
        temperature: args.temperature,
    };
    let response = session.ask(&args.question, &options).await?;

    println!("{}", response.answer);
    if !response.sources.is_empty() {
        println!("\nSources:");
        for (i, hit) in response.sources.iter().enumerate() {
            let label = hit.metadata.source.as_deref().unwrap_or("document");
            println!(
                "  {}. [{} #{}] distance {:.4}",
                i + 1,
                label,
                hit.metadata.chunk_index,
                hit.distance
            );
        }
    }

    if let Some(note) = args.log_note {
        let retrieval = &session.config().retrieval;
        let params: Params = vec![
            ("mode".to_string(), mode.as_str().into()),
            (
                "top_k".to_string(),
                args.top_k.unwrap_or(retrieval.top_k).into(),
            ),
            (
                "temperature".to_string(),
                args.temperature
                    .unwrap_or(session.config().generation.answer_temperature)
                    .into(),
            ),
            ("chunks".to_string(), report.chunks.into()),
        ];
        record(&session, &format!("Q&A: {}", args.question), &params, &note);
    }
    Ok(())
}

pub async fn run_summary(
    config: Config,
    docs: &[PathBuf],
    temperature: Option<f32>,
    log_note: Option<String>,
) -> Result<()> {
    let session = StudySession::from_config(config)?;
    let report = ingest_paths(&session, docs).await?;
    let summary = session.summarize(temperature).await?;
    println!("{}", summary);

    if let Some(note) = log_note {
        let params: Params = vec![
            (
                "temperature".to_string(),
                temperature
                    .unwrap_or(session.config().generation.summary_temperature)
                    .into(),
            ),
            ("documents".to_string(), report.documents.into()),
        ];
        record(&session, "Summary", &params, &note);
    }
    Ok(())
}

pub async fn run_mcq(
    config: Config,
    docs: &[PathBuf],
    count: usize,
    temperature: Option<f32>,
    log_note: Option<String>,
) -> Result<()> {
    let session = StudySession::from_config(config)?;
    let report = ingest_paths(&session, docs).await?;
    let set = session.mcqs(count, temperature).await?;

    if set.questions.is_empty() {
        println!("Could not parse questions; raw model output follows.\n");
        println!("{}", set.raw);
    } else {
        for (i, q) in set.questions.iter().enumerate() {
            println!("{}. {}", i + 1, q.question().map(display_value).unwrap_or_default());
            match q.options() {
                Some(Value::Array(options)) => {
                    for option in options {
                        println!("   {}", display_value(option));
                    }
                }
                Some(Value::Object(options)) => {
                    for (key, option) in options {
                        println!("   {}) {}", key, display_value(option));
                    }
                }
                Some(other) => println!("   {}", display_value(other)),
                None => {}
            }
            if let Some(answer) = q.answer() {
                println!("   Answer: {}", display_value(answer));
            }
            if let Some(explanation) = q.explanation().map(display_value) {
                if !explanation.is_empty() {
                    println!("   Why: {}", explanation);
                }
            }
            println!();
        }
    }

    if let Some(note) = log_note {
        let params: Params = vec![
            ("count".to_string(), count.into()),
            (
                "temperature".to_string(),
                temperature
                    .unwrap_or(session.config().generation.mcq_temperature)
                    .into(),
            ),
            ("parsed".to_string(), ParamValue::Int(set.questions.len() as i64)),
            ("documents".to_string(), report.documents.into()),
        ];
        record(&session, "MCQ generation", &params, &note);
    }
    Ok(())
}

/// Strings print bare; anything else prints as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn record(session: &StudySession, title: &str, params: &Params, note: &str) {
    if !session.config().experiments.enabled {
        log::warn!("--log given but [experiments].enabled is false; nothing recorded");
        return;
    }
    if session.record_experiment(title, params, note) {
        println!("\nLogged experiment to {}", session.config().experiments.log_path.display());
    }
}
