//! All backend logic independent of how the app is run (CLI or a web layer).
//!
//! Source documents live in a folder the user chooses. caserank stores only
//! config and index artifacts in its own app data directory (see [app_data]).

pub mod app_data;
pub mod artifact;
pub mod builder;
pub mod chunks;
pub mod config;
pub mod corpus;
pub mod documents;
pub mod embedding;
pub mod engine;
pub mod ollama;
pub mod registry;
pub mod store;
pub mod watcher;

#[cfg(test)]
mod testutil;

pub use app_data::app_data_dir;
pub use artifact::{ArtifactError, ArtifactStore, CorpusArtifact, FsArtifactStore};
pub use builder::{build_corpus, publish};
pub use chunks::{split, Chunk, DEFAULT_MAX_CHARS, DEFAULT_OVERLAP};
pub use config::{get_docs_root, load_config, set_docs_root, Config, ConfigError};
pub use corpus::{CorpusError, CorpusIndexManager, SearchHit};
pub use documents::{scan_documents, DocumentSource, ScanError, SourceError};
pub use embedding::{EmbedError, Embedder};
pub use engine::{Engine, RebuildError, RebuildStats};
pub use ollama::{OllamaClient, OllamaError};
pub use registry::{CreateStats, DocumentStats, EphemeralIndexRegistry, RegistryError};
pub use store::{similarity_percentage, VectorIndex};
pub use watcher::{watch_documents, WatchError};

/// Returns a short status string. Used to verify the backend is wired up.
pub fn status() -> &'static str {
    "caserank-core ready"
}
