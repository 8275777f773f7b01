//! Exact-similarity vector index over unit-normalized embeddings.
//!
//! Flat storage, exact inner-product scoring. Corpus sizes here are hundreds
//! to low thousands of documents; an approximate structure only becomes worth
//! it past single-digit millions of entries, and the search contract (ordered
//! (id, score) pairs) would stay the same.

use serde::{Deserialize, Serialize};

/// Append-only vector index. Entries get dense zero-based ids in insertion
/// order; ids are not stable across rebuilds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    /// Batch-build from a set of vectors. Each is normalized before storage.
    pub fn from_vectors(dimension: usize, vectors: Vec<Vec<f32>>) -> Self {
        let mut index = Self::new(dimension);
        for v in vectors {
            index.push(v);
        }
        index
    }

    /// Append a vector, normalizing it to unit length. Returns its id.
    pub fn push(&mut self, vector: Vec<f32>) -> usize {
        debug_assert_eq!(vector.len(), self.dimension);
        self.vectors.push(normalize(&vector));
        self.vectors.len() - 1
    }

    /// Top-k search by cosine similarity (inner product over unit vectors).
    ///
    /// Returns up to `k` (id, score) pairs sorted by descending score, ties
    /// broken by ascending id. `k` larger than the entry count returns all
    /// entries; an empty index returns an empty list.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if self.vectors.is_empty() || query.is_empty() || k == 0 {
            return Vec::new();
        }
        let q = normalize(query);
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, v)| (id, dot(&q, v)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        scored
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Cosine similarity mapped to the percentage reported to callers:
/// `score * 100`, rounded to two decimals.
pub fn similarity_percentage(score: f32) -> f32 {
    (score * 10_000.0).round() / 100.0
}

pub(crate) fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    (0..n).map(|i| a[i] * b[i]).sum()
}
