//! Discovering source documents for corpus index builds.
//!
//! The documents root is chosen by the user; we only read and index it.
//! Extraction of richer formats (PDF, scans) happens outside the core; this
//! scanner covers plain-text and markdown files.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// One document heading into the index builder: a name for the mapping and
/// the extracted text, or the reason extraction failed. A failed source is
/// skipped by the builder, never fatal to the batch.
#[derive(Debug)]
pub struct DocumentSource {
    pub name: String,
    pub text: Result<String, SourceError>,
}

impl DocumentSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Ok(text.into()),
        }
    }

    pub fn failed(name: impl Into<String>, error: SourceError) -> Self {
        Self {
            name: name.into(),
            text: Err(error),
        }
    }
}

/// Scans `root` for `.txt` and `.md` files and returns one source per file,
/// named by file name. Hidden entries are skipped; symlinked directories are
/// not followed (walkdir default). A file that cannot be read becomes a
/// failed source rather than an error for the whole scan.
pub fn scan_documents(root: &Path) -> Result<Vec<DocumentSource>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    let mut sources = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
    {
        let entry = entry.map_err(|e| ScanError::Walk(e.to_string()))?;
        let path = entry.path();
        if !is_document(path) || !path.is_file() {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match std::fs::read_to_string(path) {
            Ok(text) => sources.push(DocumentSource::new(name, text)),
            Err(e) => sources.push(DocumentSource::failed(
                name,
                SourceError::Read(path.to_path_buf(), e),
            )),
        }
    }
    Ok(sources)
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .map_or(false, |e| e == "txt" || e == "md")
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("read error for {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("extraction failed: {0}")]
    Extraction(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("walk error: {0}")]
    Walk(String),
}
