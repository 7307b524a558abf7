//! Question answering over the indexed corpus.
//!
//! In [`AnswerMode::Rag`] the question is embedded and the nearest chunks
//! become the prompt context. In [`AnswerMode::Baseline`] a truncated view
//! of the whole corpus is used instead and the index is never queried; this
//! exists to compare answers with and without retrieval.

use serde::{Deserialize, Serialize};

use crate::context::{baseline_context, format_context};
use crate::error::{CopilotError, Result};
use crate::generation::{GenerationRequest, TextGenerator};
use crate::models::{AnswerMode, AnswerResponse};
use crate::postprocess::postprocess;
use crate::prompt::{answer_prompt, ANSWER_SYSTEM_PROMPT};
use crate::store::VectorStore;

/// Retrieval knobs.
///
/// `max_k` and `distance_cutoff` are accepted and reported but do not
/// filter results; only `top_k` bounds the hit list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievalParams {
    pub top_k: usize,
    pub max_k: usize,
    pub distance_cutoff: f32,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_k: 8,
            distance_cutoff: 1.5,
        }
    }
}

/// Generation budget for answers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerSettings {
    pub temperature: f32,
    pub max_new_tokens: u32,
    /// Character budget for baseline context.
    pub max_context_chars: usize,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_new_tokens: 256,
            max_context_chars: 6000,
        }
    }
}

/// Answer `question` from the material held in `store`.
///
/// Fails with `InputValidation` for a blank question and `NotReady` when the
/// store has not been built. Generator failures surface as
/// `ExternalService`; whatever text comes back is post-processed and
/// never rejected.
pub async fn answer_question(
    question: &str,
    store: &VectorStore,
    generator: &dyn TextGenerator,
    retrieval: &RetrievalParams,
    settings: &AnswerSettings,
    mode: AnswerMode,
) -> Result<AnswerResponse> {
    let question = question.trim();
    if question.is_empty() {
        return Err(CopilotError::InputValidation(
            "question must not be empty".to_string(),
        ));
    }
    if !store.is_ready() {
        return Err(CopilotError::NotReady(
            "no documents have been indexed; ingest documents first".to_string(),
        ));
    }

    let (context, sources) = match mode {
        AnswerMode::Rag => {
            let hits = store.search(question, retrieval.top_k).await?;
            (format_context(&hits), hits)
        }
        AnswerMode::Baseline => {
            let corpus = store.corpus_text()?;
            (baseline_context(&corpus, settings.max_context_chars), Vec::new())
        }
    };

    log::debug!(
        "answering in {} mode with {} sources ({} context chars)",
        mode.as_str(),
        sources.len(),
        context.chars().count()
    );

    let request = GenerationRequest::new(answer_prompt(&context, question))
        .with_system(ANSWER_SYSTEM_PROMPT)
        .with_temperature(settings.temperature)
        .with_max_new_tokens(settings.max_new_tokens);
    let raw = generator
        .generate(&request)
        .await
        .map_err(|e| CopilotError::external("generation", e))?;

    Ok(AnswerResponse {
        answer: postprocess(&raw),
        sources,
        mode,
    })
}
