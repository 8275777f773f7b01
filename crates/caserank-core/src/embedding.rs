//! Text-to-vector embedding seam.
//!
//! [`Embedder`] is the boundary between the index machinery and whatever
//! model produces the vectors. Production uses [`crate::ollama::OllamaClient`];
//! tests use a deterministic in-process implementation.

use async_trait::async_trait;
use thiserror::Error;

/// Converts text into fixed-dimension embedding vectors.
///
/// One shared instance serves the whole process. Implementations serialize or
/// batch concurrent requests internally; the underlying model is compute-bound.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. Returns one vector per input, in input order,
    /// each of [`dimension`](Embedder::dimension) length. An empty input text
    /// yields a zero vector rather than an error; callers filter empty inputs
    /// upstream.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let batch = [text.to_string()];
        let mut vectors = self.embed_batch(&batch).await?;
        vectors.pop().ok_or_else(|| EmbedError::MissingVector {
            expected: 1,
            actual: 0,
        })
    }

    /// Number of dimensions this embedder produces.
    fn dimension(&self) -> usize;
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding request failed: {0}")]
    Request(String),
    #[error("model returned {actual} vector(s) for {expected} input(s)")]
    MissingVector { expected: usize, actual: usize },
}
