//! Deterministic in-process embedder for tests. No model server needed.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::embedding::{EmbedError, Embedder};

pub const TEST_DIMENSION: usize = 64;

/// Bag-of-words embedder: each distinct token gets its own axis, assigned on
/// first sight, so texts sharing tokens get correlated vectors and unrelated
/// texts stay orthogonal (up to TEST_DIMENSION distinct tokens). Same text
/// always maps to the same vector within one instance.
pub struct TestEmbedder {
    vocab: Mutex<HashMap<String, usize>>,
}

impl TestEmbedder {
    pub fn new() -> Self {
        Self {
            vocab: Mutex::new(HashMap::new()),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0; TEST_DIMENSION];
        let mut vocab = self.vocab.lock().unwrap();
        for token in tokenize(text) {
            let next = vocab.len();
            let axis = *vocab.entry(token).or_insert(next);
            v[axis % TEST_DIMENSION] += 1.0;
        }
        v
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[async_trait]
impl Embedder for TestEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        TEST_DIMENSION
    }
}

/// Embedder whose every call fails. For skip/propagation paths.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Err(EmbedError::Request("model offline".to_string()))
    }

    fn dimension(&self) -> usize {
        TEST_DIMENSION
    }
}
