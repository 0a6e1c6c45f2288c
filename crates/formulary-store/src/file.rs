//! [`FileDraftStorage`] -- draft slot stored as a JSON file.
//!
//! The slot file holds `{key, savedAt, draft}`. Writes go to a sibling temp
//! file and are renamed into place, all under an exclusive advisory lock on a
//! `.lock` sibling so two sessions never interleave writes.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use formulary_core::formula::Formula;

use crate::error::{PersistenceError, Result};
use crate::traits::DraftStorage;

/// Default slot name.
pub const DEFAULT_DRAFT_KEY: &str = "formulary.draft";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotFile {
    key: String,
    saved_at: DateTime<Utc>,
    draft: Formula,
}

/// Draft slot persisted to a single JSON file.
#[derive(Debug, Clone)]
pub struct FileDraftStorage {
    path: PathBuf,
    key: String,
}

impl FileDraftStorage {
    /// Creates a slot at `path` named `key`. Nothing is touched on disk yet.
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    /// Creates a slot with the default key.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self::new(path, DEFAULT_DRAFT_KEY)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }

    /// Runs `f` while holding the exclusive slot lock.
    fn with_lock<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let lock_file: File = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;

        FileExt::try_lock_exclusive(&lock_file).map_err(|e| {
            if e.kind() == ErrorKind::WouldBlock {
                PersistenceError::Locked(self.path.display().to_string())
            } else {
                PersistenceError::Io(e)
            }
        })?;

        let result = f();
        if let Err(e) = FileExt::unlock(&lock_file) {
            warn!(path = %self.path.display(), error = %e, "failed to release draft lock");
        }
        result
    }
}

impl DraftStorage for FileDraftStorage {
    fn load(&self) -> Result<Option<Formula>> {
        if !self.path.exists() {
            return Ok(None);
        }
        self.with_lock(|| {
            let content = fs::read_to_string(&self.path)?;
            if content.trim().is_empty() {
                return Ok(None);
            }
            let slot: SlotFile = serde_json::from_str(&content)?;
            if slot.key != self.key {
                debug!(found = %slot.key, expected = %self.key, "draft slot holds another key");
                return Ok(None);
            }
            debug!(path = %self.path.display(), saved_at = %slot.saved_at, "loaded draft slot");
            Ok(Some(slot.draft))
        })
    }

    fn save(&self, draft: &Formula) -> Result<()> {
        self.with_lock(|| {
            let slot = SlotFile {
                key: self.key.clone(),
                saved_at: Utc::now(),
                draft: draft.clone(),
            };
            let json = serde_json::to_vec_pretty(&slot)?;
            let tmp = self.temp_path();
            fs::write(&tmp, json)?;
            fs::rename(&tmp, &self.path)?;
            Ok(())
        })
    }

    fn clear(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.with_lock(|| match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        })
    }
}
