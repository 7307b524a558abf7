//! Core data models that flow through the study pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Provenance of a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Document name. `None` for chunks built from bare texts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// 0-based position within its own document.
    pub chunk_index: usize,
    /// Length of the chunk text in characters.
    pub char_length: usize,
}

/// A bounded piece of document text prepared for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Wrap a bare text with positional metadata and no source.
    pub fn bare(index: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        Chunk {
            metadata: ChunkMetadata {
                source: None,
                chunk_index: index,
                char_length: text.chars().count(),
            },
            text,
        }
    }
}

/// A chunk returned by a nearest-neighbour query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalHit {
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Squared L2 distance to the query; smaller is more similar.
    pub distance: f32,
}

/// How an answer was conditioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    /// Retrieved chunks as context.
    #[default]
    Rag,
    /// A truncated view of the whole corpus as context.
    Baseline,
}

impl AnswerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerMode::Rag => "rag",
            AnswerMode::Baseline => "baseline",
        }
    }
}

/// Result of one question-answering call.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
    /// Hits used as context; empty in baseline mode.
    pub sources: Vec<RetrievalHit>,
    pub mode: AnswerMode,
}

/// One generated multiple-choice question, kept as the object the model sent.
///
/// The usual keys are `question`, `options`, `answer` and `explanation`, but
/// none is required and their values are not type-checked, so a well-formed
/// response serializes back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultipleChoiceQuestion(pub Map<String, Value>);

impl MultipleChoiceQuestion {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn question(&self) -> Option<&Value> {
        self.get("question")
    }

    pub fn options(&self) -> Option<&Value> {
        self.get("options")
    }

    pub fn answer(&self) -> Option<&Value> {
        self.get("answer")
    }

    pub fn explanation(&self) -> Option<&Value> {
        self.get("explanation")
    }
}

/// Parsed questions plus the raw generator output they came from.
///
/// `questions` is empty when the output could not be parsed; callers can
/// then show `raw` instead.
#[derive(Debug, Clone, Serialize)]
pub struct McqSet {
    pub questions: Vec<MultipleChoiceQuestion>,
    pub raw: String,
}

/// Document text handed over by the document source, already extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub name: String,
    pub text: String,
}
