//! Plain-text extraction for study material (PDF, text, Markdown).
//!
//! Callers supply bytes plus a content type; this module returns UTF-8 text.
//! Extraction never panics: unreadable input is an [`ExtractError`] and the
//! caller decides whether to skip the document.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Extract text from `bytes`. Text types are decoded lossily.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    match content_type {
        MIME_PDF => extract_pdf(bytes),
        MIME_TEXT | MIME_MARKDOWN => Ok(String::from_utf8_lossy(bytes).into_owned()),
        _ => Err(ExtractError::UnsupportedContentType(
            content_type.to_string(),
        )),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed inputs; keep that inside this call.
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(result) => result.map_err(|e| ExtractError::Pdf(e.to_string())),
        Err(_) => Err(ExtractError::Pdf("parser panicked on malformed PDF".to_string())),
    }
}

/// Content type implied by a file extension.
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(MIME_PDF),
        "txt" => Some(MIME_TEXT),
        "md" | "markdown" => Some(MIME_MARKDOWN),
        _ => None,
    }
}

fn horizontal_space() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]+").expect("valid regex"))
}

fn line_endings() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\r\n?").expect("valid regex"))
}

fn blank_lines() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("valid regex"))
}

/// Tidy extracted text while keeping paragraph structure.
///
/// Turns NUL bytes into spaces, normalizes `\r\n` and lone `\r` to `\n`,
/// collapses runs of spaces and tabs, and limits blank lines to one.
pub fn clean_text(text: &str) -> String {
    let text = text.replace('\0', " ");
    let text = line_endings().replace_all(&text, "\n");
    let text = horizontal_space().replace_all(&text, " ");
    let text = blank_lines().replace_all(&text, "\n\n");
    text.trim().to_string()
}
