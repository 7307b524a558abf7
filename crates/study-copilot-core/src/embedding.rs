//! Embedder trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that all embedding backends implement,
//! plus the pure vector math the flat index relies on.
//!
//! Concrete backends (OpenAI, Ollama, fastembed) live in the `study-copilot`
//! app crate.

use anyhow::Result;
use async_trait::async_trait;

/// An embedding service: texts in, one vector per text out, same order.
///
/// Implementations must be deterministic for identical input. They do not
/// need to normalize their output; the vector store does that.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;

    /// Embed a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Scale a vector to unit L2 norm in place.
///
/// Zero vectors (and vectors too small to normalize) are left untouched.
pub fn l2_normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm < f32::EPSILON {
        return;
    }
    for x in vec.iter_mut() {
        *x /= norm;
    }
}

/// Squared Euclidean distance between two equal-length vectors.
///
/// On unit vectors this equals `2 - 2·cos(θ)`, so ranking by ascending
/// distance is ranking by descending cosine similarity.
///
/// ```text
/// d(a, b) = Σ (aᵢ - bᵢ)²
/// ```
pub fn squared_l2_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
