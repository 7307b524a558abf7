//! Sliding-window text chunker with soft boundaries.
//!
//! Splits whitespace-normalized text into overlapping windows of at most
//! `chunk_size` characters. Each window is shortened to end on a natural
//! boundary (paragraph, line, sentence, word) when one exists far enough
//! into the window, so chunks rarely cut a word or sentence in half.
//!
//! # Algorithm
//!
//! 1. Collapse every whitespace run to a single space and trim.
//! 2. Clamp `chunk_size` to at least `min_chunk_size`, and `chunk_overlap`
//!    to `[0, chunk_size - 1]`.
//! 3. Take the window `[start, start + chunk_size)`.
//! 4. For each separator in priority order, find its last occurrence in the
//!    window. The first one whose cut point lies at least 60% into the window
//!    wins; otherwise cut at the raw window edge.
//! 5. Emit the trimmed piece, then move `start` to `cut - chunk_overlap`.
//! 6. Stop at the end of the text, or when `start` would not move forward.
//!
//! All sizes and positions count characters, not bytes.
//!
//! # Example
//!
//! ```rust
//! use study_copilot_core::chunk::{chunk_document, ChunkOptions};
//!
//! let chunks = chunk_document("Newton's second law states F=ma.", &ChunkOptions::default(), Some("physics.pdf"));
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].metadata.chunk_index, 0);
//! assert_eq!(chunks[0].metadata.source.as_deref(), Some("physics.pdf"));
//! ```

use crate::models::{Chunk, ChunkMetadata};

/// A cut must land at least this far into the window to count as natural.
const BOUNDARY_RATIO: f64 = 0.6;

/// Source label used when a document has no name.
pub const DEFAULT_SOURCE: &str = "document";

/// Chunking parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkOptions {
    /// Target window size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Floor applied to `chunk_size`.
    pub min_chunk_size: usize,
    /// Boundary separators, highest priority first.
    pub separators: Vec<String>,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 150,
            min_chunk_size: 200,
            separators: default_separators(),
        }
    }
}

impl ChunkOptions {
    /// `chunk_size` after the floor is applied.
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(self.min_chunk_size).max(1)
    }

    /// `chunk_overlap` after clamping below the effective size.
    pub fn effective_overlap(&self) -> usize {
        self.chunk_overlap.min(self.effective_chunk_size() - 1)
    }
}

/// Paragraph break, line break, sentence end, space, nothing.
pub fn default_separators() -> Vec<String> {
    ["\n\n", "\n", ". ", " ", ""]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Collapse all whitespace runs to single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split text into overlapping chunks. See the module docs for the algorithm.
///
/// Returns an empty list for empty or whitespace-only input. Every returned
/// chunk is non-empty and at most [`ChunkOptions::effective_chunk_size`]
/// characters long.
pub fn chunk_text(text: &str, options: &ChunkOptions) -> Vec<String> {
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let chunk_size = options.effective_chunk_size();
    let chunk_overlap = options.effective_overlap();
    let threshold = chunk_size as f64 * BOUNDARY_RATIO;

    // offsets[i] is the byte offset of char i; the last entry is the text length.
    let offsets: Vec<usize> = normalized
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(normalized.len()))
        .collect();
    let length = offsets.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < length {
        let end = (start + chunk_size).min(length);
        let window = &normalized[offsets[start]..offsets[end]];
        let cut = natural_cut(window, start, &options.separators, threshold).unwrap_or(end);

        let piece = normalized[offsets[start]..offsets[cut]].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        if cut >= length {
            break;
        }

        let next = cut.saturating_sub(chunk_overlap);
        if next <= start {
            log::debug!(
                "chunker stopped at char {} of {}: overlap {} leaves no progress",
                cut,
                length,
                chunk_overlap
            );
            break;
        }
        start = next;
    }

    chunks
}

/// Find the first separator (by priority) whose last occurrence in the
/// window gives a cut at least `threshold` characters past `start`.
///
/// Returns the absolute character position of the cut.
fn natural_cut(window: &str, start: usize, separators: &[String], threshold: f64) -> Option<usize> {
    for sep in separators {
        if sep.is_empty() {
            continue;
        }
        let Some(byte_idx) = window.rfind(sep.as_str()) else {
            continue;
        };
        let cut = start + window[..byte_idx].chars().count() + sep.trim().chars().count();
        if (cut - start) as f64 >= threshold {
            return Some(cut);
        }
    }
    None
}

/// Chunk one document and attach per-chunk metadata.
///
/// `source` defaults to `"document"`. `chunk_index` restarts at 0 for every
/// document.
pub fn chunk_document(text: &str, options: &ChunkOptions, source: Option<&str>) -> Vec<Chunk> {
    let source = source.unwrap_or(DEFAULT_SOURCE);
    chunk_text(text, options)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            metadata: ChunkMetadata {
                source: Some(source.to_string()),
                chunk_index: index,
                char_length: text.chars().count(),
            },
            text,
        })
        .collect()
}
