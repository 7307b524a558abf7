//! Prompt templates for answering, summarizing and MCQ generation.

/// System prompt for grounded question answering.
pub const ANSWER_SYSTEM_PROMPT: &str = "You are Study Copilot, an academic AI assistant.\n\
Answer questions strictly with the provided context. Avoid speculation.\n\
If the answer is missing, say you cannot find it in the supplied notes.";

/// System prompt for study-note summaries.
pub const SUMMARY_SYSTEM_PROMPT: &str = "You write concise, structured study notes.";

/// System prompt for multiple-choice question design.
pub const MCQ_SYSTEM_PROMPT: &str =
    "You design rigorous but fair multiple-choice questions.";

/// Substituted when there is no context at all.
pub const EMPTY_CONTEXT: &str = "Context is empty.";

/// User prompt for a grounded answer.
pub fn answer_prompt(context: &str, question: &str) -> String {
    let context = if context.trim().is_empty() {
        EMPTY_CONTEXT
    } else {
        context
    };
    format!(
        "Context:\n{}\n\nQuestion: {}\nHelpful answer:",
        context, question
    )
}

pub fn summary_prompt(material: &str) -> String {
    format!(
        "Source material:\n{}\n\n\
Produce a concise study summary with:\n\
- a short overview paragraph,\n\
- 2-4 bullet lists grouped by major themes,\n\
- highlight critical formulas or definitions if present.\n\
Keep the tone friendly and academic.",
        material
    )
}

pub fn mcq_prompt(material: &str, count: usize) -> String {
    format!(
        "Use the material below to create {count} engineering-style MCQs.\n\n\
Material:\n{material}\n\n\
Return valid JSON with this schema:\n\
[\n  {{\n    \"question\": \"...\",\n    \"options\": [\"A) ...\", \"B) ...\", \"C) ...\", \"D) ...\"],\n    \
\"answer\": \"A\",\n    \"explanation\": \"1 sentence justification\"\n  }}\n]\n\
Include varied concepts and avoid trivia."
    )
}
