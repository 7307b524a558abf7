//! A study session: one corpus, its index, and the generators that use it.
//!
//! The session is what the CLI and the HTTP server drive. It owns the
//! [`VectorStore`] and serializes ingestion with an async mutex; queries go
//! straight to the store, whose snapshot swap keeps them consistent while a
//! new build runs.

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use study_copilot_core::chunk::{chunk_document, ChunkOptions};
use study_copilot_core::embedding::Embedder;
use study_copilot_core::error::{CopilotError, Result as CoreResult};
use study_copilot_core::generation::TextGenerator;
use study_copilot_core::models::{AnswerMode, AnswerResponse, McqSet, SourceDocument};
use study_copilot_core::rag::answer_question;
use study_copilot_core::store::VectorStore;
use study_copilot_core::study::{generate_mcqs, generate_summary};

use crate::config::{Config, GenerationConfig};
use crate::documents::combine_texts;
use crate::embedding::create_embedder;
use crate::experiment::{ExperimentSink, MarkdownExperimentLog, NoopExperimentLog, ParamValue};
use crate::generation::create_generator;

/// One generator per study task.
#[derive(Clone)]
pub struct TaskGenerators {
    pub answer: Arc<dyn TextGenerator>,
    pub summary: Arc<dyn TextGenerator>,
    pub mcq: Arc<dyn TextGenerator>,
}

impl TaskGenerators {
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            answer: create_generator(config, &config.answer_model)?,
            summary: create_generator(config, &config.summary_model)?,
            mcq: create_generator(config, &config.mcq_model)?,
        })
    }

    /// The same generator for every task.
    pub fn uniform(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            answer: generator.clone(),
            summary: generator.clone(),
            mcq: generator,
        }
    }
}

/// Outcome of one ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    /// Effective values after clamping.
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub dimension: Option<usize>,
    /// Documents left out because they had no text.
    pub skipped: Vec<String>,
}

/// Per-question overrides of the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub mode: AnswerMode,
    pub top_k: Option<usize>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub ready: bool,
    pub chunks: usize,
    pub documents: Vec<String>,
}

pub struct StudySession {
    config: Config,
    store: VectorStore,
    generators: TaskGenerators,
    experiments: Arc<dyn ExperimentSink>,
    build_lock: Mutex<()>,
}

impl StudySession {
    pub fn new(
        config: Config,
        embedder: Arc<dyn Embedder>,
        generators: TaskGenerators,
        experiments: Arc<dyn ExperimentSink>,
    ) -> Self {
        let store = VectorStore::new(embedder).with_batch_size(config.embedding.batch_size);
        Self {
            config,
            store,
            generators,
            experiments,
            build_lock: Mutex::new(()),
        }
    }

    /// Wire up backends and the experiment log from configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let generators = TaskGenerators::from_config(&config.generation)?;
        let experiments: Arc<dyn ExperimentSink> = if config.experiments.enabled {
            Arc::new(MarkdownExperimentLog::new(&config.experiments.log_path))
        } else {
            Arc::new(NoopExperimentLog)
        };
        Ok(Self::new(config, embedder, generators, experiments))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Taken from one store snapshot, so the counts and names always
    /// describe the same build.
    pub fn status(&self) -> SessionStatus {
        let overview = self.store.overview();
        SessionStatus {
            ready: overview.ready,
            chunks: overview.chunks,
            documents: overview.documents,
        }
    }

    /// Chunk, embed and index `documents`, replacing the current corpus.
    ///
    /// On failure the previous corpus stays in place.
    pub async fn ingest(
        &self,
        documents: Vec<SourceDocument>,
        options: &ChunkOptions,
    ) -> CoreResult<IngestReport> {
        let _build = self.build_lock.lock().await;

        let (usable, empty): (Vec<SourceDocument>, Vec<SourceDocument>) = documents
            .into_iter()
            .partition(|d| !d.text.trim().is_empty());
        let skipped: Vec<String> = empty.into_iter().map(|d| d.name).collect();
        if usable.is_empty() {
            return Err(CopilotError::InputValidation(
                "no documents with extractable text were supplied".to_string(),
            ));
        }

        let mut chunks = Vec::new();
        for doc in &usable {
            let doc_chunks = chunk_document(&doc.text, options, Some(&doc.name));
            log::debug!("{}: {} chunks", doc.name, doc_chunks.len());
            chunks.extend(doc_chunks);
        }
        let chunk_count = chunks.len();
        let corpus = combine_texts(&usable.iter().map(|d| d.text.as_str()).collect::<Vec<_>>());

        self.store.build_with_corpus(chunks, corpus).await?;

        let report = IngestReport {
            documents: usable.len(),
            chunks: chunk_count,
            chunk_size: options.effective_chunk_size(),
            chunk_overlap: options.effective_overlap(),
            dimension: self.store.dimension(),
            skipped,
        };

        log::info!(
            "ingested {} documents into {} chunks",
            report.documents,
            report.chunks
        );
        Ok(report)
    }

    pub async fn ask(&self, question: &str, options: &AskOptions) -> CoreResult<AnswerResponse> {
        let mut retrieval = self.config.retrieval.to_params();
        if let Some(top_k) = options.top_k {
            if top_k == 0 {
                return Err(CopilotError::InputValidation(
                    "top_k must be at least 1".to_string(),
                ));
            }
            retrieval.top_k = top_k;
        }
        let mut settings = self.config.generation.answer_settings();
        if let Some(t) = options.temperature {
            settings.temperature = t;
        }

        answer_question(
            question,
            &self.store,
            self.generators.answer.as_ref(),
            &retrieval,
            &settings,
            options.mode,
        )
        .await
    }

    pub async fn summarize(&self, temperature: Option<f32>) -> CoreResult<String> {
        let corpus = self.store.corpus_text()?;
        let mut settings = self.config.generation.summary_settings();
        if let Some(t) = temperature {
            settings.temperature = t;
        }
        generate_summary(&corpus, self.generators.summary.as_ref(), &settings).await
    }

    pub async fn mcqs(&self, count: usize, temperature: Option<f32>) -> CoreResult<McqSet> {
        let corpus = self.store.corpus_text()?;
        let mut settings = self.config.generation.mcq_settings();
        if let Some(t) = temperature {
            settings.temperature = t;
        }
        generate_mcqs(&corpus, count, self.generators.mcq.as_ref(), &settings).await
    }

    /// Append an experiment entry. Returns false when nothing was written:
    /// logging is disabled or the sink failed (logged, not returned).
    pub fn record_experiment(&self, title: &str, params: &[(String, ParamValue)], note: &str) -> bool {
        if !self.experiments.is_enabled() {
            log::debug!("experiment logging disabled; dropped '{}'", title);
            return false;
        }
        match self.experiments.record(title, params, note) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("failed to record experiment '{}': {:#}", title, e);
                false
            }
        }
    }
}
