//! Exact flat nearest-neighbour index.
//!
//! Vectors are stored contiguously in one row-major buffer and queried by a
//! brute-force scan of squared L2 distances. No approximation, no pruning:
//! the corpora this serves are a handful of uploaded documents.

use crate::embedding::squared_l2_distance;
use crate::error::{CopilotError, Result};

/// Index value used for padding slots when fewer vectors than requested exist.
pub const NOT_FOUND: i64 = -1;

/// One search result slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Row in insertion order, or [`NOT_FOUND`].
    pub index: i64,
    /// Squared L2 distance; `f32::MAX` for padding slots.
    pub distance: f32,
}

impl Neighbor {
    fn missing() -> Self {
        Neighbor {
            index: NOT_FOUND,
            distance: f32::MAX,
        }
    }
}

/// Brute-force L2 index over fixed-dimension vectors.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            data: Vec::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one vector.
    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(CopilotError::Configuration(format!(
                "vector has {} dimensions, index expects {}",
                vector.len(),
                self.dim
            )));
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Yield exactly `k` slots, nearest first.
    ///
    /// When `k` exceeds the number of stored vectors the tail is padded with
    /// [`NOT_FOUND`] slots. The padding is produced lazily, so memory stays
    /// proportional to the index size whatever `k` is. Equal distances keep
    /// insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<impl Iterator<Item = Neighbor>> {
        if query.len() != self.dim {
            return Err(CopilotError::Configuration(format!(
                "query vector has {} dimensions but the index was built with {}; \
                 the embedding model changed since the last build",
                query.len(),
                self.dim
            )));
        }

        let mut scored: Vec<Neighbor> = if k == 0 {
            Vec::new()
        } else {
            self.data
                .chunks_exact(self.dim)
                .enumerate()
                .map(|(i, row)| Neighbor {
                    index: i as i64,
                    distance: squared_l2_distance(query, row),
                })
                .collect()
        };
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);
        let padding = k - scored.len();
        Ok(scored
            .into_iter()
            .chain(std::iter::repeat(Neighbor::missing()).take(padding)))
    }
}
