//! Discovery and management of the `.formulary/` directory.
//!
//! The `.formulary/` directory holds a project's configuration, the
//! recoverable draft slot and (by default) saved formulas. This module finds
//! it by walking up the directory tree and creates it on `formulary init`.

use crate::config::ConfigError;
use std::path::{Path, PathBuf};

/// The name of the formulary metadata directory.
pub const FORMULARY_DIR_NAME: &str = ".formulary";

/// The environment variable that overrides directory discovery.
pub const FORMULARY_DIR_ENV: &str = "FORMULARY_DIR";

/// Find the `.formulary/` directory for `start`.
///
/// The `FORMULARY_DIR` environment variable is checked first (highest
/// priority); otherwise the tree is walked up from `start`.
pub fn find_formulary_dir(start: &Path) -> Option<PathBuf> {
    if let Ok(env_dir) = std::env::var(FORMULARY_DIR_ENV) {
        let env_path = PathBuf::from(&env_dir);
        if env_path.is_dir() {
            return Some(env_path);
        }
    }
    walk_up(start)
}

/// Walk up from `start` looking for `.formulary/`, ignoring the environment.
pub fn walk_up(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().ok()?;

    let mut current = start.as_path();
    loop {
        let candidate = current.join(FORMULARY_DIR_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) if parent != current => current = parent,
            _ => return None,
        }
    }
}

/// Ensure a `.formulary/` directory exists at (or under) `path`.
///
/// If `path` is not itself named `.formulary`, a `.formulary/` subdirectory
/// is created under it. Returns the directory path.
pub fn ensure_formulary_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    let dir = if path.ends_with(FORMULARY_DIR_NAME) {
        path.to_path_buf()
    } else {
        path.join(FORMULARY_DIR_NAME)
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
