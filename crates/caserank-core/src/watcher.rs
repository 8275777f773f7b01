//! File watcher for the documents directory. Re-scans when files change so
//! the caller can rebuild the corpus index.

use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use notify_debouncer_mini::notify;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};

use crate::documents::{scan_documents, DocumentSource, ScanError};

/// Watches `root` and calls `on_change` with a fresh scan whenever files
/// change (debounced). Blocks until the watcher is stopped (e.g. Ctrl+C).
/// Returns Ok when stopped, Err on setup failure.
pub fn watch_documents(
    root: &Path,
    on_change: impl Fn(Result<Vec<DocumentSource>, ScanError>) + Send + 'static,
) -> Result<(), WatchError> {
    if !root.is_dir() {
        return Err(WatchError::NotADirectory(root.to_path_buf()));
    }
    let root = root.canonicalize().map_err(WatchError::Canonicalize)?;
    let root_for_callback = root.clone();

    let debounce = Duration::from_millis(400);
    let mut debouncer = new_debouncer(debounce, move |res: DebounceEventResult| match res {
        Ok(_) => {
            let sources = scan_documents(&root_for_callback);
            on_change(sources);
        }
        Err(e) => tracing::error!(error = %e, "watcher error"),
    })
    .map_err(|e| WatchError::Notify(e.to_string()))?;

    debouncer
        .watcher()
        .watch(&root, notify::RecursiveMode::Recursive)
        .map_err(|e| WatchError::Watch(e.to_string()))?;

    let (_tx, rx) = mpsc::channel::<()>();
    rx.recv().ok();
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("not a directory: {0}")]
    NotADirectory(std::path::PathBuf),
    #[error("failed to resolve path: {0}")]
    Canonicalize(std::io::Error),
    #[error("watcher init: {0}")]
    Notify(String),
    #[error("watch failed: {0}")]
    Watch(String),
}
