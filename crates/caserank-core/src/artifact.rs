//! Persisted index artifacts: binary vector index plus ordered name mapping.
//!
//! The two files are versioned as a pair. Replacing one without the other is
//! caught at load time: the mapping must have exactly one entry per indexed
//! vector.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::store::VectorIndex;

/// Key of the binary index file.
pub const INDEX_KEY: &str = "corpus.index";
/// Key of the ordered list of document names, aligned with index ids.
pub const MAPPING_KEY: &str = "id2name.json";

/// Byte-level backing store for index artifacts. Local filesystem or a blob
/// store; the core does not care which.
pub trait ArtifactStore: Send + Sync {
    /// Read the bytes under `key`, or `None` if the key does not exist.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, ArtifactError>;
    /// Write `bytes` under `key`, replacing any previous value.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), ArtifactError>;
}

/// Filesystem-backed artifact store rooted at one directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    /// Creates the directory if it does not exist.
    pub fn new(dir: &Path) -> Result<Self, ArtifactError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactStore for FsArtifactStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, ArtifactError> {
        match std::fs::read(self.dir.join(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        std::fs::write(self.dir.join(key), bytes)?;
        Ok(())
    }
}

/// A built corpus index together with its id→name mapping. `mapping[i]` is
/// the document whose vector has id `i`.
#[derive(Debug, Clone)]
pub struct CorpusArtifact {
    pub index: VectorIndex,
    pub mapping: Vec<String>,
}

impl CorpusArtifact {
    /// Serialize and write both files of the pair.
    pub fn save(&self, store: &dyn ArtifactStore) -> Result<(), ArtifactError> {
        let index_bytes =
            bincode::serialize(&self.index).map_err(|e| ArtifactError::Corrupt(e.to_string()))?;
        let mapping_bytes = serde_json::to_vec(&self.mapping)
            .map_err(|e| ArtifactError::Corrupt(e.to_string()))?;
        store.write(INDEX_KEY, &index_bytes)?;
        store.write(MAPPING_KEY, &mapping_bytes)?;
        Ok(())
    }

    /// Read and parse both files, enforcing the length-match invariant.
    pub fn load(store: &dyn ArtifactStore) -> Result<Self, ArtifactError> {
        let index_bytes = store
            .read(INDEX_KEY)?
            .ok_or_else(|| ArtifactError::Missing(INDEX_KEY.to_string()))?;
        let mapping_bytes = store
            .read(MAPPING_KEY)?
            .ok_or_else(|| ArtifactError::Missing(MAPPING_KEY.to_string()))?;

        let index: VectorIndex = bincode::deserialize(&index_bytes)
            .map_err(|e| ArtifactError::Corrupt(format!("{INDEX_KEY}: {e}")))?;
        let mapping: Vec<String> = serde_json::from_slice(&mapping_bytes)
            .map_err(|e| ArtifactError::Corrupt(format!("{MAPPING_KEY}: {e}")))?;

        if index.len() != mapping.len() {
            return Err(ArtifactError::LengthMismatch {
                vectors: index.len(),
                names: mapping.len(),
            });
        }
        Ok(Self { index, mapping })
    }
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    Missing(String),
    #[error("artifact corrupt: {0}")]
    Corrupt(String),
    #[error("index has {vectors} vector(s) but mapping has {names} name(s)")]
    LengthMismatch { vectors: usize, names: usize },
    #[error("artifact io: {0}")]
    Io(#[from] std::io::Error),
}
