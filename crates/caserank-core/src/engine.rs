//! Process-wide retrieval service: one embedder, one corpus manager, one
//! ephemeral registry, constructed explicitly at startup and passed by
//! handle to callers (web layer, CLI, batch jobs).

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::artifact::{ArtifactError, ArtifactStore};
use crate::builder;
use crate::config::Config;
use crate::corpus::{CorpusError, CorpusIndexManager, SearchHit};
use crate::documents::DocumentSource;
use crate::embedding::Embedder;
use crate::registry::{CreateStats, DocumentStats, EphemeralIndexRegistry, RegistryError};

/// Outcome of a corpus rebuild.
#[derive(Debug, Clone, Serialize)]
pub struct RebuildStats {
    pub documents_processed: usize,
    pub vector_dimension: usize,
}

/// The retrieval engine. One instance per process.
pub struct Engine {
    corpus: CorpusIndexManager,
    registry: EphemeralIndexRegistry,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ArtifactStore>,
}

impl Engine {
    pub fn new(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        let corpus = CorpusIndexManager::new(
            store.clone(),
            embedder.clone(),
            config.top_k_min,
            config.top_k_max,
        );
        let registry = EphemeralIndexRegistry::new(
            embedder.clone(),
            config.registry_max_entries,
            config.chunk_max_chars,
            config.chunk_overlap,
        );
        Self {
            corpus,
            registry,
            embedder,
            store,
        }
    }

    /// Startup hook: load the corpus index now instead of on first search.
    pub async fn load_corpus(&self) -> Result<(), CorpusError> {
        self.corpus.load().await
    }

    /// Documents in the currently served corpus index, if loaded.
    pub async fn corpus_document_count(&self) -> Option<usize> {
        self.corpus.document_count().await
    }

    /// Ranked corpus search; `top_k` is clamped to the configured bounds.
    pub async fn search_corpus(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, CorpusError> {
        self.corpus.search(query, top_k).await
    }

    /// Build a fresh corpus index from `sources`, publish the artifact pair,
    /// and swap it in atomically. Searches keep hitting the old index until
    /// the new one is fully loaded and validated.
    pub async fn rebuild_corpus_index(
        &self,
        sources: Vec<DocumentSource>,
    ) -> Result<RebuildStats, RebuildError> {
        let artifact = builder::build_corpus(sources, &*self.embedder).await;
        let stats = RebuildStats {
            documents_processed: artifact.mapping.len(),
            vector_dimension: artifact.index.dimension(),
        };
        builder::publish(&artifact, &*self.store)?;
        self.corpus.reload().await?;
        Ok(stats)
    }

    /// Chunk + embed `text` into a private index under `document_id`.
    pub async fn create_ephemeral_index(
        &self,
        document_id: &str,
        text: &str,
    ) -> Result<CreateStats, RegistryError> {
        self.registry.create(document_id, text).await
    }

    /// Most relevant chunk texts of one ingested document.
    pub async fn query_ephemeral_index(
        &self,
        document_id: &str,
        question: &str,
        k: usize,
    ) -> Result<Vec<String>, RegistryError> {
        self.registry.query(document_id, question, k).await
    }

    /// Drop the ephemeral index for `document_id`. Idempotent.
    pub async fn destroy_ephemeral_index(&self, document_id: &str) {
        self.registry.destroy(document_id).await;
    }

    pub async fn ephemeral_stats(&self, document_id: &str) -> DocumentStats {
        self.registry.stats(document_id).await
    }
}

#[derive(Debug, Error)]
pub enum RebuildError {
    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),
}
