//! Seams between the store and its environment.
//!
//! The store depends on these traits rather than on concrete backends so the
//! same command logic runs against an in-memory fake in tests and a file (or
//! browser local storage) in production.

use formulary_core::formula::Formula;

use crate::error::Result;

/// Single-slot persistence for the unsaved draft.
///
/// This is a crash/reload recovery mechanism: exactly one slot, no
/// versioning, no merging.
pub trait DraftStorage: Send + Sync {
    /// Reads the slot. `Ok(None)` means no recoverable draft exists.
    fn load(&self) -> Result<Option<Formula>>;

    /// Overwrites the slot with the given draft.
    fn save(&self, draft: &Formula) -> Result<()>;

    /// Empties the slot. Clearing an empty slot is not an error.
    fn clear(&self) -> Result<()>;
}

/// A compatibility recheck the store wants performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityRequest {
    /// Monotonic tag; only a response carrying the latest tag is applied.
    pub generation: u64,
    /// Ingredient ids currently in the draft, in line order.
    pub ingredient_ids: Vec<String>,
}

/// Receives compatibility rechecks scheduled by ingredient mutations.
///
/// Implementations must return immediately; the check itself runs in the
/// background and reports back through
/// [`FormulaStore::apply_compatibility`](crate::FormulaStore::apply_compatibility).
pub trait RecheckSink: Send + Sync {
    fn schedule(&self, request: CompatibilityRequest);
}

/// Sink that drops every request (stores without a compatibility backend).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecheck;

impl RecheckSink for NoopRecheck {
    fn schedule(&self, _request: CompatibilityRequest) {}
}
