//! Formula wizard for the formulary system.
//!
//! [`WizardController`] enforces step ordering and per-step validation on
//! top of a [`FormulaStore`](formulary_store::FormulaStore) and owns the
//! collaborator-backed flows (reference data, AI generation, save).
//! [`CompatibilityScheduler`] debounces compatibility rechecks.

pub mod controller;
pub mod scheduler;

pub use controller::{GenerationTicket, SaveTicket, WizardController};
pub use scheduler::{CompatibilityOutcome, CompatibilityScheduler, DEFAULT_DEBOUNCE};
