//! Rendering retrieved chunks (or the whole corpus) into bounded prompt context.

use crate::chunk::normalize_whitespace;
use crate::models::RetrievalHit;

/// Marker appended when baseline context is truncated.
pub const TRUNCATION_PLACEHOLDER: &str = " ...";

/// Render hits as `[<source>] <text>` blocks separated by a blank line.
///
/// Hits without a source are labelled `chunk-<n>` (1-based rank).
pub fn format_context(hits: &[RetrievalHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let label = hit
                .metadata
                .source
                .clone()
                .unwrap_or_else(|| format!("chunk-{}", i + 1));
            format!("[{}] {}", label, hit.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Collapse whitespace and fit the text into `width` characters.
///
/// Text that already fits is returned as-is (collapsed). Otherwise whole
/// words are kept while `words + placeholder` still fits, and the
/// placeholder is appended. If not even one word fits, only the trimmed
/// placeholder is returned.
pub fn shorten(text: &str, width: usize, placeholder: &str) -> String {
    let collapsed = normalize_whitespace(text);
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let budget = width.saturating_sub(placeholder.chars().count());
    let mut out = String::new();
    let mut used = 0usize;
    for word in collapsed.split(' ') {
        let cost = word.chars().count() + usize::from(!out.is_empty());
        if used + cost > budget {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
        used += cost;
    }

    if out.is_empty() {
        return placeholder.trim_start().to_string();
    }
    out.push_str(placeholder);
    out
}

/// Baseline context: the corpus shortened to `max_chars`.
pub fn baseline_context(corpus: &str, max_chars: usize) -> String {
    shorten(corpus, max_chars, TRUNCATION_PLACEHOLDER)
}

/// Whitespace-normalize and hard-cut to `limit` characters.
pub fn clean_context(text: &str, limit: usize) -> String {
    normalize_whitespace(text).chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    fn hit(text: &str, source: Option<&str>) -> RetrievalHit {
        RetrievalHit {
            text: text.to_string(),
            metadata: ChunkMetadata {
                source: source.map(str::to_string),
                chunk_index: 0,
                char_length: text.len(),
            },
            distance: 0.0,
        }
    }

    #[test]
    fn test_format_with_sources() {
        let hits = vec![
            hit("F = ma.", Some("physics.pdf")),
            hit("V = IR.", Some("circuits.pdf")),
        ];
        assert_eq!(
            format_context(&hits),
            "[physics.pdf] F = ma.\n\n[circuits.pdf] V = IR."
        );
    }

    #[test]
    fn test_format_falls_back_to_rank_label() {
        let hits = vec![hit("first", Some("a.pdf")), hit("second", None)];
        assert_eq!(format_context(&hits), "[a.pdf] first\n\n[chunk-2] second");
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn test_shorten_fits() {
        assert_eq!(shorten("a  b\n c", 10, " ..."), "a b c");
    }

    #[test]
    fn test_shorten_truncates_on_words() {
        let out = shorten("the quick brown fox jumps over the lazy dog", 20, " ...");
        assert_eq!(out, "the quick brown ...");
        assert!(out.chars().count() <= 20);
    }

    #[test]
    fn test_shorten_no_word_fits() {
        assert_eq!(shorten("supercalifragilistic word", 6, " ..."), "...");
    }

    #[test]
    fn test_baseline_never_exceeds_budget() {
        let corpus = "lorem ipsum dolor sit amet ".repeat(500);
        let out = baseline_context(&corpus, 6000);
        assert!(out.chars().count() <= 6000);
        assert!(out.ends_with(TRUNCATION_PLACEHOLDER));
    }

    #[test]
    fn test_clean_context() {
        assert_eq!(clean_context("  a\n\nb   c  ", 3), "a b");
        assert_eq!(clean_context("", 10), "");
    }
}
