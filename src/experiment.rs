//! Append-only experiment notes.
//!
//! Each entry records what was tried (title and parameters) and what was
//! observed, as a Markdown section:
//!
//! ```text
//! ### 2026-03-01 14:05 – top_k sweep
//!
//! **Parameters:** top_k=3, temperature=0.2
//!
//! **Observation:** fewer off-topic sources
//!
//! ---
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A scalar parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<usize> for ParamValue {
    fn from(n: usize) -> Self {
        ParamValue::Int(n as i64)
    }
}

impl From<f32> for ParamValue {
    fn from(x: f32) -> Self {
        // Through the decimal form so 0.2f32 logs as 0.2.
        ParamValue::Float(x.to_string().parse().unwrap_or(x as f64))
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

pub type Params = Vec<(String, ParamValue)>;

/// Deserialize a JSON object of scalars into [`Params`], keeping the
/// caller's key order.
pub fn params_in_order<'de, D>(deserializer: D) -> std::result::Result<Params, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct ParamsVisitor;

    impl<'de> serde::de::Visitor<'de> for ParamsVisitor {
        type Value = Params;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an object of scalar parameters")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Params, A::Error>
        where
            A: serde::de::MapAccess<'de>,
        {
            let mut params = Params::new();
            while let Some((key, value)) = map.next_entry::<String, ParamValue>()? {
                params.push((key, value));
            }
            Ok(params)
        }
    }

    deserializer.deserialize_map(ParamsVisitor)
}

/// Destination for experiment entries.
pub trait ExperimentSink: Send + Sync {
    fn record(&self, title: &str, params: &[(String, ParamValue)], note: &str) -> Result<()>;

    /// False when entries are discarded.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Used when experiment logging is disabled.
pub struct NoopExperimentLog;

impl ExperimentSink for NoopExperimentLog {
    fn record(&self, _title: &str, _params: &[(String, ParamValue)], _note: &str) -> Result<()> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Appends entries to a Markdown file, creating it and its directory.
pub struct MarkdownExperimentLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl MarkdownExperimentLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExperimentSink for MarkdownExperimentLog {
    fn record(&self, title: &str, params: &[(String, ParamValue)], note: &str) -> Result<()> {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M").to_string();
        let entry = format_entry(&timestamp, title, params, note);

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create experiment log directory: {}", parent.display())
                })?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open experiment log: {}", self.path.display()))?;
        file.write_all(entry.as_bytes())?;
        Ok(())
    }
}

/// Render one Markdown entry.
pub fn format_entry(
    timestamp: &str,
    title: &str,
    params: &[(String, ParamValue)],
    note: &str,
) -> String {
    let param_line = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ");
    let param_line = if param_line.is_empty() {
        "n/a".to_string()
    } else {
        param_line
    };
    let note = match note.trim() {
        "" => "n/a",
        n => n,
    };

    format!(
        "### {} – {}\n\n**Parameters:** {}\n\n**Observation:** {}\n\n---\n",
        timestamp, title, param_line, note
    )
}
