//! # Study Copilot
//!
//! A retrieval-augmented study assistant. Load PDFs or notes, then ask
//! grounded questions, produce study summaries, or generate multiple-choice
//! questions, from the CLI or over a JSON HTTP API.
//!
//! The pipeline itself (chunking, vector index, prompts, post-processing)
//! lives in `study-copilot-core`. This crate supplies the I/O around it:
//! configuration, document loading, embedding and generation backends, the
//! experiment log, and the two front-ends.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ documents  │──▶│ StudySession │──▶│ core VectorStore │
//! │ PDF/txt/md │   │ ingest / ask │   │ flat L2 index    │
//! └────────────┘   └──────┬───────┘   └──────────────────┘
//!                         │
//!            ┌────────────┼─────────────┐
//!            ▼            ▼             ▼
//!       ┌─────────┐  ┌──────────┐  ┌────────────┐
//!       │   CLI   │  │   HTTP   │  │ experiment │
//!       │ (study) │  │  (axum)  │  │    log     │
//!       └─────────┘  └──────────┘  └────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`extract`] | PDF and text extraction, text cleaning |
//! | [`documents`] | File discovery, loading, de-duplication |
//! | [`embedding`] | Embedding backends (local, OpenAI, Ollama) |
//! | [`generation`] | Text generation backends (OpenAI, Ollama) |
//! | [`experiment`] | Markdown experiment log |
//! | [`session`] | One corpus plus the task flows over it |
//! | [`study_cmd`] | CLI command implementations |
//! | [`server`] | HTTP API |

pub mod config;
pub mod documents;
pub mod embedding;
pub mod experiment;
pub mod extract;
pub mod generation;
pub mod server;
pub mod session;
pub mod study_cmd;
