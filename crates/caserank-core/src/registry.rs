//! Per-document ephemeral indices: created when a document is ingested,
//! queried for relevant chunks, destroyed when the caller is done.
//!
//! Every document gets its own private index and chunk store; entries never
//! share state. An entry is fully built before it becomes visible, so a
//! concurrent query sees either the whole entry or nothing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::chunks::{self, Chunk};
use crate::embedding::{EmbedError, Embedder};
use crate::store::VectorIndex;

/// Result of creating an ephemeral index.
#[derive(Debug, Clone, Serialize)]
pub struct CreateStats {
    pub chunk_count: usize,
}

/// Snapshot of one document's ephemeral state.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStats {
    pub exists: bool,
    pub chunk_count: usize,
    pub dimension: usize,
}

/// Chunk store + private index for one document. Immutable once published.
struct EphemeralIndex {
    chunks: Vec<Chunk>,
    index: VectorIndex,
}

struct Entry {
    data: Arc<EphemeralIndex>,
    last_used: Instant,
}

/// Registry of per-document ephemeral indices, keyed by document id.
///
/// Bounded: past `max_entries`, inserting a new document evicts the least
/// recently used entry. Explicit [`destroy`](EphemeralIndexRegistry::destroy)
/// remains the primary cleanup path.
pub struct EphemeralIndexRegistry {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<HashMap<String, Entry>>,
    max_entries: usize,
    chunk_max_chars: usize,
    chunk_overlap: usize,
}

impl EphemeralIndexRegistry {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        max_entries: usize,
        chunk_max_chars: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            embedder,
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
            chunk_max_chars,
            chunk_overlap,
        }
    }

    /// Chunk `text`, embed the chunks, and register a private index under
    /// `document_id`. Re-creating an existing id replaces it (last write
    /// wins). Fails with [`RegistryError::EmptyDocument`] when chunking
    /// yields nothing.
    ///
    /// The index is built before the registry lock is taken, so concurrent
    /// creates for different ids do not serialize behind each other's
    /// embedding work.
    pub async fn create(
        &self,
        document_id: &str,
        text: &str,
    ) -> Result<CreateStats, RegistryError> {
        let chunks: Vec<Chunk> =
            chunks::split(document_id, text, self.chunk_max_chars, self.chunk_overlap).collect();
        if chunks.is_empty() {
            return Err(RegistryError::EmptyDocument);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        let index = VectorIndex::from_vectors(self.embedder.dimension(), vectors);
        let chunk_count = chunks.len();
        let data = Arc::new(EphemeralIndex { chunks, index });

        let mut entries = self.entries.write().await;
        entries.insert(
            document_id.to_string(),
            Entry {
                data,
                last_used: Instant::now(),
            },
        );
        evict_over_capacity(&mut entries, self.max_entries);
        info!(document = document_id, chunks = chunk_count, "ephemeral index created");
        Ok(CreateStats { chunk_count })
    }

    /// Return the text of the `k` chunks most similar to `question`. Fails
    /// with [`RegistryError::NotFound`] when no index exists for the id.
    pub async fn query(
        &self,
        document_id: &str,
        question: &str,
        k: usize,
    ) -> Result<Vec<String>, RegistryError> {
        let data = {
            let mut entries = self.entries.write().await;
            let entry = entries
                .get_mut(document_id)
                .ok_or_else(|| RegistryError::NotFound(document_id.to_string()))?;
            entry.last_used = Instant::now();
            entry.data.clone()
        };

        let vector = self.embedder.embed(question).await?;
        let hits = data.index.search(&vector, k);
        Ok(hits
            .into_iter()
            .filter_map(|(id, _)| data.chunks.get(id).map(|c| c.text.clone()))
            .collect())
    }

    /// Remove the entry for `document_id`. Removing an absent id is a no-op.
    pub async fn destroy(&self, document_id: &str) {
        let removed = self.entries.write().await.remove(document_id);
        if removed.is_some() {
            info!(document = document_id, "ephemeral index destroyed");
        } else {
            debug!(document = document_id, "destroy for unknown id, nothing to do");
        }
    }

    pub async fn stats(&self, document_id: &str) -> DocumentStats {
        match self.entries.read().await.get(document_id) {
            Some(entry) => DocumentStats {
                exists: true,
                chunk_count: entry.data.chunks.len(),
                dimension: entry.data.index.dimension(),
            },
            None => DocumentStats {
                exists: false,
                chunk_count: 0,
                dimension: 0,
            },
        }
    }

    /// Number of registered documents.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn evict_over_capacity(entries: &mut HashMap<String, Entry>, max_entries: usize) {
    while entries.len() > max_entries {
        let Some(oldest) = entries
            .iter()
            .min_by_key(|(_, e)| e.last_used)
            .map(|(id, _)| id.clone())
        else {
            return;
        };
        entries.remove(&oldest);
        info!(document = %oldest, "ephemeral index evicted (capacity)");
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Chunking produced nothing: no retrievable content.
    #[error("document has no extractable text")]
    EmptyDocument,
    /// No ephemeral index registered under this id; create one first.
    #[error("no ephemeral index for document: {0}")]
    NotFound(String),
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{TestEmbedder, TEST_DIMENSION};

    fn registry(max_entries: usize) -> EphemeralIndexRegistry {
        EphemeralIndexRegistry::new(Arc::new(TestEmbedder::new()), max_entries, 80, 10)
    }

    #[tokio::test]
    async fn create_then_query_returns_relevant_chunk_text() {
        let registry = registry(8);
        let text = "Section 1: The agreement may be terminated with thirty days notice. \
                    The termination clause survives assignment. \
                    Section 2: Payment is due on the first business day of each month, \
                    with interest accruing on late balances.";
        let stats = registry.create("doc1", text).await.unwrap();
        assert!(stats.chunk_count > 1);

        let chunks = registry
            .query("doc1", "When can the agreement be terminated?", 1)
            .await
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("terminated"));
    }

    #[tokio::test]
    async fn empty_document_is_rejected() {
        let registry = registry(8);
        assert!(matches!(
            registry.create("doc1", "   \n\t ").await,
            Err(RegistryError::EmptyDocument)
        ));
        assert!(!registry.stats("doc1").await.exists);
    }

    #[tokio::test]
    async fn query_unknown_id_is_not_found() {
        let registry = registry(8);
        assert!(matches!(
            registry.query("ghost", "anything", 3).await,
            Err(RegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let registry = registry(8);
        registry.create("doc1", "some contract text").await.unwrap();
        registry.destroy("doc1").await;
        registry.destroy("doc1").await;
        assert!(!registry.stats("doc1").await.exists);
    }

    #[tokio::test]
    async fn recreate_replaces_the_previous_entry() {
        let registry = registry(8);
        let long = "clause ".repeat(40);
        registry.create("doc1", &long).await.unwrap();
        let before = registry.stats("doc1").await.chunk_count;
        assert!(before > 1);

        registry.create("doc1", "short text").await.unwrap();
        let stats = registry.stats("doc1").await;
        assert_eq!(stats.chunk_count, 1);
        assert_eq!(stats.dimension, TEST_DIMENSION);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let registry = registry(2);
        registry.create("a", "alpha text").await.unwrap();
        registry.create("b", "bravo text").await.unwrap();
        // Touch "a" so "b" is the LRU entry.
        registry.query("a", "alpha", 1).await.unwrap();

        registry.create("c", "charlie text").await.unwrap();
        assert_eq!(registry.len().await, 2);
        assert!(registry.stats("a").await.exists);
        assert!(!registry.stats("b").await.exists);
        assert!(registry.stats("c").await.exists);
    }

    #[tokio::test]
    async fn entries_are_isolated_per_document() {
        let registry = registry(8);
        registry
            .create("contract", "termination clause and notice periods")
            .await
            .unwrap();
        registry
            .create("tax", "depreciation schedules and deductions")
            .await
            .unwrap();

        let hits = registry
            .query("tax", "termination clause", 5)
            .await
            .unwrap();
        // Only tax chunks can come back, however weak the match.
        assert!(hits.iter().all(|c| c.contains("depreciation")));
    }
}
