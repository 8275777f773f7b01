//! Corpus index manager: loads the persisted artifact pair once, serves
//! concurrent similarity searches, and swaps in rebuilt indices atomically.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::artifact::{ArtifactError, ArtifactStore, CorpusArtifact};
use crate::embedding::{EmbedError, Embedder};
use crate::store::similarity_percentage;

/// One corpus search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub document_name: String,
    /// Raw cosine similarity in [-1, 1].
    pub score: f32,
    /// `score * 100`, rounded to two decimals.
    pub similarity_percentage: f32,
}

/// Immutable loaded corpus: index plus aligned name mapping. Searches hold an
/// `Arc` to whichever snapshot was current when they started.
#[derive(Debug)]
struct Snapshot {
    artifact: CorpusArtifact,
}

enum State {
    Unloaded,
    Ready(Arc<Snapshot>),
    Failed(String),
}

/// Owns the single persistent corpus index.
///
/// Lifecycle: Unloaded → Ready on first search (or explicit [`load`]), with
/// load failures latched until a [`reload`] succeeds. Reload parses and
/// validates the new artifact entirely outside the lock, then swaps the
/// snapshot pointer under a brief write lock, so readers either see the old
/// index or the new one, never a partial state.
///
/// [`load`]: CorpusIndexManager::load
/// [`reload`]: CorpusIndexManager::reload
pub struct CorpusIndexManager {
    state: RwLock<State>,
    store: Arc<dyn ArtifactStore>,
    embedder: Arc<dyn Embedder>,
    top_k_min: usize,
    top_k_max: usize,
}

impl CorpusIndexManager {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        embedder: Arc<dyn Embedder>,
        top_k_min: usize,
        top_k_max: usize,
    ) -> Self {
        Self {
            state: RwLock::new(State::Unloaded),
            store,
            embedder,
            top_k_min: top_k_min.max(1),
            top_k_max: top_k_max.max(1),
        }
    }

    /// Startup hook: load now instead of on the first search.
    pub async fn load(&self) -> Result<(), CorpusError> {
        self.snapshot().await.map(|_| ())
    }

    /// Number of documents in the currently served index, if loaded.
    pub async fn document_count(&self) -> Option<usize> {
        match &*self.state.read().await {
            State::Ready(snap) => Some(snap.artifact.mapping.len()),
            _ => None,
        }
    }

    /// Search the corpus for the documents most similar to `query`.
    ///
    /// `top_k` is clamped to the configured bounds rather than rejected.
    /// Triggers the initial load if the index has not been loaded yet; a
    /// latched load failure is reported as [`CorpusError::Unavailable`] until
    /// a reload succeeds.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, CorpusError> {
        let snapshot = self.snapshot().await?;
        let k = top_k.clamp(self.top_k_min, self.top_k_max);
        let vector = self.embedder.embed(query).await?;
        let hits = snapshot.artifact.index.search(&vector, k);
        Ok(map_hits(&snapshot.artifact.mapping, hits))
    }

    /// Replace the served index with a freshly loaded artifact pair.
    ///
    /// The slow load/parse runs without any lock held; the old index keeps
    /// serving searches until the new one is validated, then the swap is one
    /// pointer write. A failed reload leaves a previously loaded index in
    /// place (and latches the failure otherwise).
    pub async fn reload(&self) -> Result<(), CorpusError> {
        match self.load_snapshot() {
            Ok(snapshot) => {
                let documents = snapshot.artifact.mapping.len();
                *self.state.write().await = State::Ready(snapshot);
                info!(documents, "corpus index reloaded");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "corpus reload failed");
                let mut state = self.state.write().await;
                if !matches!(*state, State::Ready(_)) {
                    *state = State::Failed(e.to_string());
                }
                Err(CorpusError::Unavailable(e.to_string()))
            }
        }
    }

    /// Current snapshot, loading it first if this is the first use. The write
    /// lock is held across the initial load, so searches arriving while the
    /// load runs block until it resolves.
    async fn snapshot(&self) -> Result<Arc<Snapshot>, CorpusError> {
        {
            match &*self.state.read().await {
                State::Ready(snap) => return Ok(snap.clone()),
                State::Failed(reason) => return Err(CorpusError::Unavailable(reason.clone())),
                State::Unloaded => {}
            }
        }
        let mut state = self.state.write().await;
        match &*state {
            State::Ready(snap) => Ok(snap.clone()),
            State::Failed(reason) => Err(CorpusError::Unavailable(reason.clone())),
            State::Unloaded => match self.load_snapshot() {
                Ok(snap) => {
                    info!(documents = snap.artifact.mapping.len(), "corpus index loaded");
                    *state = State::Ready(snap.clone());
                    Ok(snap)
                }
                Err(e) => {
                    warn!(error = %e, "corpus index load failed");
                    *state = State::Failed(e.to_string());
                    Err(CorpusError::Unavailable(e.to_string()))
                }
            },
        }
    }

    fn load_snapshot(&self) -> Result<Arc<Snapshot>, ArtifactError> {
        let artifact = CorpusArtifact::load(&*self.store)?;
        Ok(Arc::new(Snapshot { artifact }))
    }
}

/// Map raw index hits through the name mapping. An id beyond the mapping
/// means the index and mapping are out of sync; the hit is dropped and the
/// desync logged.
fn map_hits(mapping: &[String], hits: Vec<(usize, f32)>) -> Vec<SearchHit> {
    let mut out = Vec::with_capacity(hits.len());
    for (id, score) in hits {
        match mapping.get(id) {
            Some(name) => out.push(SearchHit {
                document_name: name.clone(),
                score,
                similarity_percentage: similarity_percentage(score),
            }),
            None => warn!(
                id,
                mapped = mapping.len(),
                "search hit has no mapping entry, discarding"
            ),
        }
    }
    out
}

#[derive(Debug, Error)]
pub enum CorpusError {
    /// Index artifacts missing, corrupt, or mismatched. Retryable once a
    /// reload succeeds.
    #[error("corpus index unavailable: {0}")]
    Unavailable(String),
    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbedError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{FsArtifactStore, INDEX_KEY};
    use crate::builder::{build_corpus, publish};
    use crate::documents::DocumentSource;
    use crate::testutil::TestEmbedder;

    async fn publish_corpus(
        store: &FsArtifactStore,
        embedder: &TestEmbedder,
        docs: &[(&str, &str)],
    ) {
        let sources = docs
            .iter()
            .map(|(name, text)| DocumentSource::new(*name, *text))
            .collect();
        let artifact = build_corpus(sources, embedder).await;
        publish(&artifact, store).unwrap();
    }

    fn manager(store: &FsArtifactStore, embedder: Arc<TestEmbedder>) -> CorpusIndexManager {
        CorpusIndexManager::new(Arc::new(store.clone()), embedder, 1, 50)
    }

    #[tokio::test]
    async fn first_search_triggers_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path()).unwrap();
        let embedder = Arc::new(TestEmbedder::new());
        publish_corpus(&store, &embedder, &[("lease.txt", "lease agreement terms")]).await;

        let manager = manager(&store, embedder);
        assert_eq!(manager.document_count().await, None);

        let hits = manager.search("lease agreement", 5).await.unwrap();
        assert_eq!(hits[0].document_name, "lease.txt");
        assert_eq!(manager.document_count().await, Some(1));
    }

    #[tokio::test]
    async fn load_failure_latches_until_reload_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path()).unwrap();
        let embedder = Arc::new(TestEmbedder::new());

        let manager = manager(&store, embedder.clone());
        assert!(matches!(
            manager.search("anything", 5).await,
            Err(CorpusError::Unavailable(_))
        ));
        // Still failed, even though the artifact now exists: no silent retry.
        publish_corpus(&store, &embedder, &[("a.txt", "alpha")]).await;
        assert!(matches!(
            manager.search("alpha", 5).await,
            Err(CorpusError::Unavailable(_))
        ));

        manager.reload().await.unwrap();
        let hits = manager.search("alpha", 5).await.unwrap();
        assert_eq!(hits[0].document_name, "a.txt");
    }

    #[tokio::test]
    async fn reload_swaps_to_the_new_document_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path()).unwrap();
        let embedder = Arc::new(TestEmbedder::new());
        publish_corpus(&store, &embedder, &[("old.txt", "shared words")]).await;

        let manager = manager(&store, embedder.clone());
        manager.load().await.unwrap();

        publish_corpus(
            &store,
            &embedder,
            &[("new_a.txt", "shared words"), ("new_b.txt", "shared words")],
        )
        .await;
        manager.reload().await.unwrap();

        let hits = manager.search("shared words", 10).await.unwrap();
        let names: Vec<&str> = hits.iter().map(|h| h.document_name.as_str()).collect();
        assert_eq!(names, vec!["new_a.txt", "new_b.txt"]);
    }

    #[tokio::test]
    async fn failed_reload_keeps_serving_the_old_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path()).unwrap();
        let embedder = Arc::new(TestEmbedder::new());
        publish_corpus(&store, &embedder, &[("old.txt", "alpha")]).await;

        let manager = manager(&store, embedder);
        manager.load().await.unwrap();

        store.write(INDEX_KEY, b"garbage").unwrap();
        assert!(manager.reload().await.is_err());

        let hits = manager.search("alpha", 5).await.unwrap();
        assert_eq!(hits[0].document_name, "old.txt");
    }

    #[tokio::test]
    async fn top_k_is_clamped_not_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path()).unwrap();
        let embedder = Arc::new(TestEmbedder::new());
        publish_corpus(
            &store,
            &embedder,
            &[("a.txt", "common"), ("b.txt", "common"), ("c.txt", "common")],
        )
        .await;

        let manager = manager(&store, embedder);
        assert_eq!(manager.search("common", 0).await.unwrap().len(), 1);
        assert_eq!(manager.search("common", 1000).await.unwrap().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_searches_see_old_or_new_never_a_mix() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path()).unwrap();
        let embedder = Arc::new(TestEmbedder::new());
        publish_corpus(
            &store,
            &embedder,
            &[("old_a.txt", "shared"), ("old_b.txt", "shared")],
        )
        .await;

        let manager = Arc::new(manager(&store, embedder.clone()));
        manager.load().await.unwrap();

        publish_corpus(
            &store,
            &embedder,
            &[
                ("new_a.txt", "shared"),
                ("new_b.txt", "shared"),
                ("new_c.txt", "shared"),
            ],
        )
        .await;

        let reloader = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.reload().await.unwrap() })
        };
        let searchers: Vec<_> = (0..16)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.search("shared", 10).await.unwrap() })
            })
            .collect();

        reloader.await.unwrap();
        for task in searchers {
            let hits = task.await.unwrap();
            let all_old = hits.iter().all(|h| h.document_name.starts_with("old_"));
            let all_new = hits.iter().all(|h| h.document_name.starts_with("new_"));
            assert!(all_old || all_new, "mixed snapshot observed: {hits:?}");
        }
    }

    #[test]
    fn out_of_mapping_hits_are_discarded() {
        let mapping = vec!["only.txt".to_string()];
        let hits = map_hits(&mapping, vec![(0, 0.9), (7, 0.8)]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_name, "only.txt");
        assert_eq!(hits[0].similarity_percentage, 90.0);
    }
}
