//! Persisted config (documents root, model, index tuning) in the app data
//! directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app_data;
use crate::chunks::{DEFAULT_MAX_CHARS, DEFAULT_OVERLAP};
use crate::ollama::{DEFAULT_BASE_URL, DEFAULT_DIMENSION, DEFAULT_EMBED_MODEL};

const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the user's source documents directory (chosen by them).
    pub docs_root: Option<String>,
    /// Where index artifacts live. Defaults to the app data directory.
    pub store_dir: Option<String>,
    /// Base URL of the Ollama server.
    pub ollama_url: String,
    /// Embedding model name.
    pub embed_model: String,
    /// Output dimension of the embedding model.
    pub embed_dimension: usize,
    /// Maximum characters per chunk (ephemeral indexing).
    pub chunk_max_chars: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Lower bound applied to search top_k.
    pub top_k_min: usize,
    /// Upper bound applied to search top_k.
    pub top_k_max: usize,
    /// Maximum concurrently registered ephemeral indices (LRU beyond this).
    pub registry_max_entries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            docs_root: None,
            store_dir: None,
            ollama_url: DEFAULT_BASE_URL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            embed_dimension: DEFAULT_DIMENSION,
            chunk_max_chars: DEFAULT_MAX_CHARS,
            chunk_overlap: DEFAULT_OVERLAP,
            top_k_min: 1,
            top_k_max: 50,
            registry_max_entries: 64,
        }
    }
}

impl Config {
    /// Rejects settings the index machinery cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_max_chars == 0 {
            return Err(ConfigError::Invalid("chunk_max_chars must be > 0".into()));
        }
        if self.chunk_overlap >= self.chunk_max_chars {
            return Err(ConfigError::Invalid(
                "chunk_overlap must be smaller than chunk_max_chars".into(),
            ));
        }
        if self.top_k_min == 0 || self.top_k_min > self.top_k_max {
            return Err(ConfigError::Invalid(
                "top_k bounds must satisfy 1 <= top_k_min <= top_k_max".into(),
            ));
        }
        if self.embed_dimension == 0 {
            return Err(ConfigError::Invalid("embed_dimension must be > 0".into()));
        }
        if self.registry_max_entries == 0 {
            return Err(ConfigError::Invalid(
                "registry_max_entries must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Directory holding the index artifact pair: the configured override or
    /// the app data directory.
    pub fn store_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = self.store_dir.as_deref().filter(|s| !s.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        app_data::app_data_dir()
            .map(|d| d.join("store"))
            .ok_or(ConfigError::NoDataDir)
    }
}

/// Load config from the app data directory. Returns default config if missing
/// or invalid.
pub fn load_config() -> Config {
    let Some(data_dir) = app_data::app_data_dir() else {
        return Config::default();
    };
    let path = data_dir.join(CONFIG_FILENAME);
    let Ok(s) = std::fs::read_to_string(&path) else {
        return Config::default();
    };
    toml::from_str(&s).unwrap_or_default()
}

/// Save config to the app data directory.
pub fn save_config(config: &Config) -> Result<(), ConfigError> {
    let data_dir = app_data::app_data_dir().ok_or(ConfigError::NoDataDir)?;
    let path = data_dir.join(CONFIG_FILENAME);
    let s = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    std::fs::write(&path, s).map_err(ConfigError::Write)
}

/// Get the configured documents root path, if any.
pub fn get_docs_root() -> Option<PathBuf> {
    load_config()
        .docs_root
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

/// Set and persist the documents root.
pub fn set_docs_root(path: &Path) -> Result<(), ConfigError> {
    let path = path.canonicalize().map_err(ConfigError::Canonicalize)?;
    if !path.is_dir() {
        return Err(ConfigError::NotADirectory(path));
    }
    let mut config = load_config();
    config.docs_root = Some(path.to_string_lossy().into_owned());
    save_config(&config)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine app data directory")]
    NoDataDir,
    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(std::io::Error),
    #[error("failed to resolve path: {0}")]
    Canonicalize(std::io::Error),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("invalid config: {0}")]
    Invalid(String),
}
