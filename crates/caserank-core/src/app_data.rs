//! Where caserank stores its own data (config, index artifacts).
//!
//! User documents stay in the folder they choose. We only store app state
//! here.

use std::path::PathBuf;

/// Returns the directory where caserank stores config and index artifacts.
/// Creates the directory if it doesn't exist; returns `None` if we can't
/// determine the path.
pub fn app_data_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("app", "Caserank", "Caserank")?
        .data_local_dir()
        .to_path_buf();
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}
