//! TOML configuration.
//!
//! Every section is optional; a missing section or key takes the default
//! shown in [`Config::default`]. [`load_config`] parses and validates.
//!
//! ```toml
//! [chunking]
//! chunk_size = 800
//! chunk_overlap = 150
//!
//! [embedding]
//! provider = "local"
//! model = "all-minilm-l6-v2"
//!
//! [generation]
//! provider = "openai"
//! answer_model = "gpt-4o-mini"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use study_copilot_core::chunk::{default_separators, ChunkOptions};
use study_copilot_core::generation::MAX_TEMPERATURE;
use study_copilot_core::rag::{AnswerSettings, RetrievalParams};
use study_copilot_core::study::TaskSettings;

/// Path tried when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/study.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub experiments: ExperimentsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_chunk_size: default_min_chunk_size(),
            separators: default_separators(),
        }
    }
}

impl ChunkingConfig {
    pub fn to_options(&self) -> ChunkOptions {
        ChunkOptions {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            min_chunk_size: self.min_chunk_size,
            separators: self.separators.clone(),
        }
    }
}

fn default_chunk_size() -> usize {
    800
}
fn default_chunk_overlap() -> usize {
    150
}
fn default_min_chunk_size() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Accepted but not applied to results.
    #[serde(default = "default_max_k")]
    pub max_k: usize,
    /// Accepted but not applied to results.
    #[serde(default = "default_distance_cutoff")]
    pub distance_cutoff: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_k: default_max_k(),
            distance_cutoff: default_distance_cutoff(),
        }
    }
}

impl RetrievalConfig {
    pub fn to_params(&self) -> RetrievalParams {
        RetrievalParams {
            top_k: self.top_k,
            max_k: self.max_k,
            distance_cutoff: self.distance_cutoff,
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_max_k() -> usize {
    8
}
fn default_distance_cutoff() -> f32 {
    1.5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            url: None,
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_embedding_model() -> String {
    "all-minilm-l6-v2".to_string()
}
fn default_batch_size() -> usize {
    32
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Environment variable holding the API key (openai provider).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_generation_model")]
    pub answer_model: String,
    #[serde(default = "default_answer_temperature")]
    pub answer_temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub answer_max_tokens: u32,

    #[serde(default = "default_generation_model")]
    pub summary_model: String,
    #[serde(default = "default_summary_temperature")]
    pub summary_temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub summary_max_tokens: u32,

    #[serde(default = "default_generation_model")]
    pub mcq_model: String,
    #[serde(default = "default_mcq_temperature")]
    pub mcq_temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub mcq_max_tokens: u32,

    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    #[serde(default = "default_max_summary_chars")]
    pub max_summary_chars: usize,
    #[serde(default = "default_max_mcq_chars")]
    pub max_mcq_chars: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            url: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_generation_timeout_secs(),
            answer_model: default_generation_model(),
            answer_temperature: default_answer_temperature(),
            answer_max_tokens: default_max_tokens(),
            summary_model: default_generation_model(),
            summary_temperature: default_summary_temperature(),
            summary_max_tokens: default_max_tokens(),
            mcq_model: default_generation_model(),
            mcq_temperature: default_mcq_temperature(),
            mcq_max_tokens: default_max_tokens(),
            max_context_chars: default_max_context_chars(),
            max_summary_chars: default_max_summary_chars(),
            max_mcq_chars: default_max_mcq_chars(),
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    pub fn answer_settings(&self) -> AnswerSettings {
        AnswerSettings {
            temperature: self.answer_temperature,
            max_new_tokens: self.answer_max_tokens,
            max_context_chars: self.max_context_chars,
        }
    }

    pub fn summary_settings(&self) -> TaskSettings {
        TaskSettings {
            temperature: self.summary_temperature,
            max_new_tokens: self.summary_max_tokens,
            max_chars: self.max_summary_chars,
        }
    }

    pub fn mcq_settings(&self) -> TaskSettings {
        TaskSettings {
            temperature: self.mcq_temperature,
            max_new_tokens: self.mcq_max_tokens,
            max_chars: self.max_mcq_chars,
        }
    }
}

fn default_generation_provider() -> String {
    "openai".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_generation_timeout_secs() -> u64 {
    120
}
fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_answer_temperature() -> f32 {
    0.2
}
fn default_summary_temperature() -> f32 {
    0.25
}
fn default_mcq_temperature() -> f32 {
    0.6
}
fn default_max_tokens() -> u32 {
    256
}
fn default_max_context_chars() -> usize {
    6000
}
fn default_max_summary_chars() -> usize {
    4500
}
fn default_max_mcq_chars() -> usize {
    5000
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.pdf".to_string(),
        "**/*.txt".to_string(),
        "**/*.md".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExperimentsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
}

impl Default for ExperimentsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: default_log_path(),
        }
    }
}

fn default_log_path() -> PathBuf {
    PathBuf::from("docs/experiments.md")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

/// Read, parse and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Load `path`, or fall back to defaults when the default path is absent.
///
/// An explicitly requested file that does not exist is an error.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config(p),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                load_config(default)
            } else {
                log::debug!("no config at {}; using defaults", DEFAULT_CONFIG_PATH);
                Ok(Config::default())
            }
        }
    }
}

/// Parse and validate TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Chunking
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }

    // Retrieval
    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }

    // Embedding
    if config.embedding.batch_size < 1 {
        bail!("embedding.batch_size must be >= 1");
    }
    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }
    if config.embedding.is_enabled() && config.embedding.model.trim().is_empty() {
        bail!(
            "embedding.model must be specified when provider is '{}'",
            config.embedding.provider
        );
    }

    // Generation
    let gen = &config.generation;
    match gen.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown generation provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }
    for (key, value) in [
        ("answer_temperature", gen.answer_temperature),
        ("summary_temperature", gen.summary_temperature),
        ("mcq_temperature", gen.mcq_temperature),
    ] {
        if !(0.0..=MAX_TEMPERATURE).contains(&value) {
            bail!("generation.{} must be in [0.0, {}]", key, MAX_TEMPERATURE);
        }
    }
    if gen.is_enabled() {
        for (key, value) in [
            ("answer_model", &gen.answer_model),
            ("summary_model", &gen.summary_model),
            ("mcq_model", &gen.mcq_model),
        ] {
            if value.trim().is_empty() {
                bail!(
                    "generation.{} must be specified when provider is '{}'",
                    key,
                    gen.provider
                );
            }
        }
    }

    Ok(())
}
