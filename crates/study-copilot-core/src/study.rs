//! Summary and multiple-choice question generation over the corpus.

use crate::context::clean_context;
use crate::error::{CopilotError, Result};
use crate::generation::{GenerationRequest, TextGenerator};
use crate::models::{McqSet, MultipleChoiceQuestion};
use crate::prompt::{mcq_prompt, summary_prompt, MCQ_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT};

/// Budget for one study task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskSettings {
    pub temperature: f32,
    pub max_new_tokens: u32,
    /// Characters of corpus passed to the generator.
    pub max_chars: usize,
}

impl TaskSettings {
    pub fn summary_defaults() -> Self {
        Self {
            temperature: 0.25,
            max_new_tokens: 256,
            max_chars: 4500,
        }
    }

    pub fn mcq_defaults() -> Self {
        Self {
            temperature: 0.6,
            max_new_tokens: 256,
            max_chars: 5000,
        }
    }
}

/// Summarize the leading part of `corpus` as study notes.
pub async fn generate_summary(
    corpus: &str,
    generator: &dyn TextGenerator,
    settings: &TaskSettings,
) -> Result<String> {
    let material = clean_context(corpus, settings.max_chars);
    if material.is_empty() {
        return Err(CopilotError::InputValidation(
            "no material to summarize".to_string(),
        ));
    }

    let request = GenerationRequest::new(summary_prompt(&material))
        .with_system(SUMMARY_SYSTEM_PROMPT)
        .with_temperature(settings.temperature)
        .with_max_new_tokens(settings.max_new_tokens);
    let summary = generator
        .generate(&request)
        .await
        .map_err(|e| CopilotError::external("generation", e))?;
    Ok(summary.trim().to_string())
}

/// Ask the generator for `count` questions and parse what comes back.
///
/// Unparseable output is not an error; see [`parse_mcqs`].
pub async fn generate_mcqs(
    corpus: &str,
    count: usize,
    generator: &dyn TextGenerator,
    settings: &TaskSettings,
) -> Result<McqSet> {
    if count == 0 {
        return Err(CopilotError::InputValidation(
            "question count must be at least 1".to_string(),
        ));
    }
    let material = clean_context(corpus, settings.max_chars);
    if material.is_empty() {
        return Err(CopilotError::InputValidation(
            "no material to build questions from".to_string(),
        ));
    }

    let request = GenerationRequest::new(mcq_prompt(&material, count))
        .with_system(MCQ_SYSTEM_PROMPT)
        .with_temperature(settings.temperature)
        .with_max_new_tokens(settings.max_new_tokens);
    let raw = generator
        .generate(&request)
        .await
        .map_err(|e| CopilotError::external("generation", e))?;

    let set = parse_mcqs(&raw);
    if set.questions.is_empty() {
        log::warn!("generator output was not a JSON question list; returning raw text");
    }
    Ok(set)
}

/// Parse a JSON array of question objects.
///
/// Objects are taken as they are, whatever keys and value types they carry.
/// Anything else (invalid JSON, a non-array, non-object items) yields an
/// empty list with `raw` kept untouched.
pub fn parse_mcqs(raw: &str) -> McqSet {
    let questions = serde_json::from_str::<Vec<MultipleChoiceQuestion>>(raw.trim())
        .unwrap_or_default();
    McqSet {
        questions,
        raw: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGenerator;
    use serde_json::Value;

    const WELL_FORMED: &str = r#"[
      {"question": "What does F=ma relate?", "options": ["A) Force, mass, acceleration", "B) Power", "C) Work", "D) Energy"], "answer": "A", "explanation": "Newton's second law."},
      {"question": "Unit of resistance?", "options": ["A) Volt", "B) Ohm", "C) Amp", "D) Watt"], "answer": "B", "explanation": "R is in ohms.", "difficulty": "easy"}
    ]"#;

    #[test]
    fn test_parse_round_trip() {
        let set = parse_mcqs(WELL_FORMED);
        assert_eq!(set.questions.len(), 2);
        assert_eq!(set.questions[1].answer(), Some(&Value::from("B")));

        let original: Value = serde_json::from_str(WELL_FORMED).unwrap();
        let reserialized = serde_json::to_value(&set.questions).unwrap();
        assert_eq!(original, reserialized);
    }

    #[test]
    fn test_parse_does_not_add_missing_keys() {
        let raw = r#"[{"question": "q?", "options": ["A) x", "B) y"], "answer": "A"}]"#;
        let set = parse_mcqs(raw);
        assert_eq!(set.questions.len(), 1);
        assert!(set.questions[0].explanation().is_none());
        assert_eq!(
            serde_json::to_value(&set.questions).unwrap(),
            serde_json::from_str::<Value>(raw).unwrap()
        );
    }

    #[test]
    fn test_parse_accepts_loose_value_types() {
        let raw = r#"[{"question": "q?", "options": {"A": "x", "B": "y"}, "answer": 0, "explanation": "e"}]"#;
        let set = parse_mcqs(raw);
        assert_eq!(set.questions.len(), 1);
        assert_eq!(set.questions[0].answer(), Some(&Value::from(0)));
        assert_eq!(
            serde_json::to_value(&set.questions).unwrap(),
            serde_json::from_str::<Value>(raw).unwrap()
        );
    }

    #[test]
    fn test_parse_malformed_keeps_raw() {
        let raw = "Here are some questions:\n1. What is F?";
        let set = parse_mcqs(raw);
        assert!(set.questions.is_empty());
        assert_eq!(set.raw, raw);
    }

    #[test]
    fn test_parse_non_array() {
        assert!(parse_mcqs(r#"{"question": "x"}"#).questions.is_empty());
        assert!(parse_mcqs("[1, 2]").questions.is_empty());
    }

    #[tokio::test]
    async fn test_summary_trims_and_bounds_material() {
        let gen = ScriptedGenerator::replying("\n  Overview of mechanics.  \n");
        let corpus = "word ".repeat(2000);
        let settings = TaskSettings::summary_defaults();

        let out = generate_summary(&corpus, &gen, &settings).await.unwrap();
        assert_eq!(out, "Overview of mechanics.");

        let req = gen.last_request();
        assert_eq!(req.system.as_deref(), Some(SUMMARY_SYSTEM_PROMPT));
        assert_eq!(req.temperature, 0.25);
        assert!(req.prompt.len() < corpus.len());
    }

    #[tokio::test]
    async fn test_summary_empty_corpus() {
        let gen = ScriptedGenerator::replying("x");
        let err = generate_summary("  \n ", &gen, &TaskSettings::summary_defaults())
            .await
            .unwrap_err();
        assert!(matches!(err, CopilotError::InputValidation(_)));
    }

    #[tokio::test]
    async fn test_mcqs_parsed() {
        let gen = ScriptedGenerator::replying(WELL_FORMED);
        let set = generate_mcqs("Newton and Ohm.", 2, &gen, &TaskSettings::mcq_defaults())
            .await
            .unwrap();
        assert_eq!(set.questions.len(), 2);
        assert!(gen.last_request().prompt.contains("create 2 engineering-style MCQs"));
    }

    #[tokio::test]
    async fn test_mcqs_malformed_degrades() {
        let gen = ScriptedGenerator::replying("not json");
        let set = generate_mcqs("Newton.", 3, &gen, &TaskSettings::mcq_defaults())
            .await
            .unwrap();
        assert!(set.questions.is_empty());
        assert_eq!(set.raw, "not json");
    }

    #[tokio::test]
    async fn test_mcqs_zero_count() {
        let gen = ScriptedGenerator::replying("[]");
        let err = generate_mcqs("Newton.", 0, &gen, &TaskSettings::mcq_defaults())
            .await
            .unwrap_err();
        assert!(matches!(err, CopilotError::InputValidation(_)));
    }

    #[tokio::test]
    async fn test_mcqs_generator_failure() {
        let gen = ScriptedGenerator::failing("timeout");
        let err = generate_mcqs("Newton.", 1, &gen, &TaskSettings::mcq_defaults())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "upstream_error");
    }
}
