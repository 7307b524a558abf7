//! Document source: turning files on disk into `(name, text)` pairs.
//!
//! Explicit file paths are taken as given. Directories are walked and
//! filtered with include/exclude globs (relative to the directory), then
//! sorted so ingestion order is deterministic.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use study_copilot_core::models::SourceDocument;

use crate::config::DocumentsConfig;
use crate::extract::{clean_text, content_type_for_path, extract_text};

/// Files loaded plus what was left out.
#[derive(Debug, Default)]
pub struct LoadedDocuments {
    pub documents: Vec<SourceDocument>,
    /// Names of files with no usable text or duplicate content.
    pub skipped: Vec<String>,
}

/// Expand `paths` into the list of files to ingest.
pub fn discover(paths: &[PathBuf], config: &DocumentsConfig) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec!["**/.git/**".to_string(), "**/target/**".to_string()];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = Vec::new();
    for root in paths {
        if !root.exists() {
            bail!("Document path does not exist: {}", root.display());
        }
        if root.is_file() {
            files.push(root.clone());
            continue;
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(root).follow_links(config.follow_symlinks) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().to_string();

            if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
                continue;
            }
            found.push(path.to_path_buf());
        }
        found.sort();
        files.extend(found);
    }

    Ok(files)
}

/// Extract every discovered file into a [`SourceDocument`].
///
/// Unsupported, unreadable or empty files are skipped with a warning, as
/// are files whose cleaned text duplicates an earlier one.
pub fn load_documents(paths: &[PathBuf], config: &DocumentsConfig) -> Result<LoadedDocuments> {
    let mut loaded = LoadedDocuments::default();
    let mut seen = HashSet::new();

    for path in discover(paths, config)? {
        let name = display_name(&path);
        let text = match read_document(&path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("skipping {}: {:#}", path.display(), e);
                loaded.skipped.push(name);
                continue;
            }
        };

        if text.is_empty() {
            log::warn!("skipping {}: no extractable text", path.display());
            loaded.skipped.push(name);
            continue;
        }
        if !seen.insert(content_hash(&text)) {
            log::warn!("skipping {}: duplicate content", path.display());
            loaded.skipped.push(name);
            continue;
        }

        loaded.documents.push(SourceDocument { name, text });
    }

    log::info!(
        "loaded {} documents ({} skipped)",
        loaded.documents.len(),
        loaded.skipped.len()
    );
    Ok(loaded)
}

/// Read and extract one file, returning cleaned text.
pub fn read_document(path: &Path) -> Result<String> {
    let content_type = content_type_for_path(path)
        .with_context(|| format!("unsupported file type: {}", path.display()))?;
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))?;
    let text = extract_text(&bytes, content_type)?;
    Ok(clean_text(&text))
}

/// Join cleaned texts with a blank line, dropping empty ones.
pub fn combine_texts<S: AsRef<str>>(texts: &[S]) -> String {
    texts
        .iter()
        .map(|t| clean_text(t.as_ref()))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Hex SHA-256 of a document's text.
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
