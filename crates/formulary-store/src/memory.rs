//! [`MemoryDraftStorage`] -- in-process draft slot.

use std::sync::{Arc, Mutex};

use formulary_core::formula::Formula;

use crate::error::{PersistenceError, Result};
use crate::traits::DraftStorage;

/// Draft slot held in memory.
///
/// Clones share the same slot, so a test can keep a handle and inspect what
/// the store persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryDraftStorage {
    slot: Arc<Mutex<Option<Formula>>>,
}

impl MemoryDraftStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot that already holds a draft.
    pub fn with_draft(draft: Formula) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(draft))),
        }
    }

    /// Returns a copy of the slot contents.
    pub fn snapshot(&self) -> Option<Formula> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    /// `true` if the slot holds a draft.
    pub fn is_populated(&self) -> bool {
        self.snapshot().is_some()
    }
}

impl DraftStorage for MemoryDraftStorage {
    fn load(&self) -> Result<Option<Formula>> {
        let slot = self
            .slot
            .lock()
            .map_err(|e| PersistenceError::internal(format!("mutex poisoned: {e}")))?;
        Ok(slot.clone())
    }

    fn save(&self, draft: &Formula) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| PersistenceError::internal(format!("mutex poisoned: {e}")))?;
        *slot = Some(draft.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| PersistenceError::internal(format!("mutex poisoned: {e}")))?;
        *slot = None;
        Ok(())
    }
}
