//! Corpus build pipeline: document sources → whole-document embeddings →
//! index + name mapping.

use tracing::{info, warn};

use crate::artifact::{ArtifactError, ArtifactStore, CorpusArtifact};
use crate::documents::DocumentSource;
use crate::embedding::Embedder;
use crate::store::VectorIndex;

/// Builds a fresh corpus index from `sources`. Each document is embedded
/// whole; chunking is reserved for the per-document ephemeral path.
///
/// Sources that are unreadable, empty, or fail to embed are logged and
/// skipped; one bad document never aborts the batch. The result carries
/// exactly one mapping entry per indexed vector, in insertion order, so the
/// same document set always produces an index of the same size and ordering.
pub async fn build_corpus(sources: Vec<DocumentSource>, embedder: &dyn Embedder) -> CorpusArtifact {
    let mut index = VectorIndex::new(embedder.dimension());
    let mut mapping = Vec::new();
    for source in sources {
        let text = match source.text {
            Ok(t) => t,
            Err(e) => {
                warn!(document = %source.name, error = %e, "skipping unreadable document");
                continue;
            }
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            warn!(document = %source.name, "skipping document with no extractable text");
            continue;
        }
        match embedder.embed(trimmed).await {
            Ok(vector) => {
                index.push(vector);
                mapping.push(source.name);
            }
            Err(e) => {
                warn!(document = %source.name, error = %e, "embedding failed, document skipped");
            }
        }
    }
    info!(
        documents = mapping.len(),
        dimension = index.dimension(),
        "corpus index built"
    );
    CorpusArtifact { index, mapping }
}

/// Writes the artifact pair through `store`.
pub fn publish(artifact: &CorpusArtifact, store: &dyn ArtifactStore) -> Result<(), ArtifactError> {
    artifact.save(store)?;
    info!(documents = artifact.mapping.len(), "corpus artifact published");
    Ok(())
}
