//! Ollama-backed [`Embedder`]. Wraps ollama-rs with a simple batched API.

use std::sync::Arc;

use async_trait::async_trait;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use ollama_rs::Ollama;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::embedding::{EmbedError, Embedder};

pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
/// Output dimension of `nomic-embed-text`.
pub const DEFAULT_DIMENSION: usize = 768;

/// Embedding client for a local Ollama server.
///
/// Cheap to clone; all clones share one request gate so concurrent batch
/// calls are served one at a time.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    inner: Ollama,
    embed_model: String,
    dimension: usize,
    gate: Arc<Semaphore>,
}

impl OllamaClient {
    /// Create from URL string. Default: http://localhost:11434.
    pub fn from_url(url: &str) -> Result<Self, OllamaError> {
        let inner = Ollama::try_new(url).map_err(OllamaError::ParseUrl)?;
        Ok(Self {
            inner,
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
            gate: Arc::new(Semaphore::new(1)),
        })
    }

    /// Create with default localhost:11434.
    pub fn localhost() -> Self {
        Self::from_url(DEFAULT_BASE_URL).expect("default URL is valid")
    }

    /// Set the embedding model (e.g. `nomic-embed-text`, `all-minilm`).
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    /// Set the expected output dimension of the configured model.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    async fn request_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbedError> {
        // One in-flight request at a time; the model is compute-bound.
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| EmbedError::Request(e.to_string()))?;
        let req = GenerateEmbeddingsRequest::new(
            self.embed_model.clone(),
            EmbeddingsInput::Multiple(texts),
        );
        let res = self
            .inner
            .generate_embeddings(req)
            .await
            .map_err(|e| EmbedError::Request(e.to_string()))?;
        Ok(res.embeddings)
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Empty inputs get a zero vector instead of going to the model, which
        // rejects them. Non-empty inputs go out as one batch.
        let mut non_empty = Vec::new();
        let mut positions = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            if !text.trim().is_empty() {
                non_empty.push(text.clone());
                positions.push(i);
            }
        }

        let mut out = vec![vec![0.0; self.dimension]; texts.len()];
        if non_empty.is_empty() {
            return Ok(out);
        }

        let embeddings = self.request_batch(non_empty).await?;
        if embeddings.len() != positions.len() {
            return Err(EmbedError::MissingVector {
                expected: positions.len(),
                actual: embeddings.len(),
            });
        }
        for (pos, vector) in positions.into_iter().zip(embeddings) {
            out[pos] = vector;
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("invalid Ollama URL: {0}")]
    ParseUrl(#[from] url::ParseError),
}
