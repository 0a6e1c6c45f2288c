//! Formula draft store for the formulary system.
//!
//! Provides [`FormulaStore`], the single-writer container for the draft under
//! construction, plus the [`DraftStorage`] trait with in-memory
//! ([`MemoryDraftStorage`]) and file-backed ([`FileDraftStorage`]) slots.

pub mod error;
pub mod file;
pub mod memory;
pub mod status;
pub mod store;
pub mod traits;

// Re-exports for convenience.
pub use error::PersistenceError;
pub use file::FileDraftStorage;
pub use memory::MemoryDraftStorage;
pub use status::{OperationState, OperationStatus};
pub use store::{FieldUpdate, FormulaStore, WizardState};
pub use traits::{CompatibilityRequest, DraftStorage, NoopRecheck, RecheckSink};
