//! # Study Copilot Core
//!
//! Pure pipeline logic for Study Copilot: data models, sliding-window
//! chunking, the embedder and text-generator traits, an exact flat vector
//! index, prompt construction, answer post-processing, and the RAG, summary
//! and MCQ flows built on top of them.
//!
//! This crate performs no network or filesystem I/O. Embedding and
//! generation backends are supplied by the application through the
//! [`embedding::Embedder`] and [`generation::TextGenerator`] traits.
//!
//! ## Data Flow
//!
//! ```text
//! text ──▶ chunk ──▶ VectorStore::build ──▶ (texts, metadatas, FlatIndex)
//!
//! question ──▶ VectorStore::search ──▶ format_context ──▶ prompt
//!          ──▶ TextGenerator ──▶ postprocess ──▶ AnswerResponse
//! ```

pub mod chunk;
pub mod context;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod models;
pub mod postprocess;
pub mod prompt;
pub mod rag;
pub mod store;
pub mod study;

#[cfg(test)]
pub(crate) mod testing;
