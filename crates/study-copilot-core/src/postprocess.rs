//! Clean-up of raw generator output into a short, standalone answer.
//!
//! Generators are not bound to answer-only output: they echo the prompt,
//! repeat the system instructions, or pad with boilerplate. The pipeline
//! below filters the common cases. Each stage is total; the result is
//! always some string.
//!
//! | Stage | Effect |
//! |-------|--------|
//! | marker | keep text after the last `answer:` (case-insensitive) |
//! | echo | drop `context:` / `question:` lines and system-prompt lines, join with spaces |
//! | cap | keep the first [`MAX_SENTENCES`] sentences |
//! | fallback | empty or refusal-echo output becomes [`FALLBACK_ANSWER`] |

use std::sync::OnceLock;

use regex::Regex;

/// Maximum sentences kept in an answer.
pub const MAX_SENTENCES: usize = 7;

/// Returned when nothing usable survives the filters.
pub const FALLBACK_ANSWER: &str = "I could not find the answer in the supplied material.";

const ANSWER_MARKER: &str = "answer:";

const ECHO_PREFIXES: &[&str] = &["context:", "question:"];

/// Lowercase fragments of the answer system prompt and its usual echoes.
const SYSTEM_PROMPT_FRAGMENTS: &[&str] = &[
    "you are study copilot",
    "academic ai assistant",
    "answer questions strictly",
    "strictly with the provided context",
    "avoid speculation",
    "if the answer is missing",
];

/// Left over when the model parrots the refusal instruction instead of using it.
const REFUSAL_ECHO: &str = "say you cannot find it";

fn sentence_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("valid sentence regex"))
}

/// Run all four stages over raw generator output.
pub fn postprocess(raw: &str) -> String {
    let answer = extract_after_marker(raw);
    let answer = strip_echoes(answer);
    let answer = cap_sentences(&answer, MAX_SENTENCES);
    apply_fallback(answer)
}

/// Text after the last case-insensitive `answer:`, or all of it.
pub fn extract_after_marker(raw: &str) -> &str {
    // ASCII lowering keeps byte offsets aligned with `raw`.
    let lowered = raw.to_ascii_lowercase();
    match lowered.rfind(ANSWER_MARKER) {
        Some(pos) => &raw[pos + ANSWER_MARKER.len()..],
        None => raw,
    }
}

/// Drop echoed prompt lines and join the rest into one paragraph.
pub fn strip_echoes(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let lowered = line.to_ascii_lowercase();
            !ECHO_PREFIXES.iter().any(|p| lowered.starts_with(p))
                && !SYSTEM_PROMPT_FRAGMENTS.iter().any(|f| lowered.contains(f))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keep at most `max` sentences, rejoined with single spaces.
pub fn cap_sentences(text: &str, max: usize) -> String {
    let mut sentences: Vec<&str> = Vec::new();
    let mut last = 0usize;
    for m in sentence_end().find_iter(text) {
        // The punctuation mark is a single ASCII byte.
        sentences.push(text[last..m.start() + 1].trim());
        last = m.end();
    }
    sentences.push(text[last..].trim());

    sentences
        .into_iter()
        .filter(|s| !s.is_empty())
        .take(max)
        .collect::<Vec<_>>()
        .join(" ")
}

fn apply_fallback(answer: String) -> String {
    let trimmed = answer.trim();
    if trimmed.is_empty() || trimmed.to_ascii_lowercase().contains(REFUSAL_ECHO) {
        FALLBACK_ANSWER.to_string()
    } else {
        trimmed.to_string()
    }
}
