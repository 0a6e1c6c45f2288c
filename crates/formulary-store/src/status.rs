//! Per-operation async status.
//!
//! Each remote operation has its own `{loading, error}` slot so a failure in
//! one (say, AI generation) never blocks unrelated UI.

use std::collections::BTreeMap;

use serde::Serialize;

use formulary_core::enums::Operation;

/// Status of one named operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationState {
    pub loading: bool,
    pub error: Option<String>,
}

/// Status slots for every tracked operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OperationStatus(BTreeMap<Operation, OperationState>);

impl OperationStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an operation as in flight and clears its previous error.
    pub fn begin(&mut self, op: Operation) {
        let slot = self.0.entry(op).or_default();
        slot.loading = true;
        slot.error = None;
    }

    /// Marks an operation as finished successfully.
    pub fn succeed(&mut self, op: Operation) {
        let slot = self.0.entry(op).or_default();
        slot.loading = false;
        slot.error = None;
    }

    /// Marks an operation as failed with a user-visible message.
    pub fn fail(&mut self, op: Operation, message: impl Into<String>) {
        let slot = self.0.entry(op).or_default();
        slot.loading = false;
        slot.error = Some(message.into());
    }

    /// Clears a displayed error without retrying. Returns `true` if one was set.
    pub fn dismiss(&mut self, op: Operation) -> bool {
        self.0
            .get_mut(&op)
            .and_then(|slot| slot.error.take())
            .is_some()
    }

    pub fn get(&self, op: Operation) -> OperationState {
        self.0.get(&op).cloned().unwrap_or_default()
    }

    pub fn is_loading(&self, op: Operation) -> bool {
        self.0.get(&op).is_some_and(|slot| slot.loading)
    }

    pub fn error(&self, op: Operation) -> Option<&str> {
        self.0.get(&op).and_then(|slot| slot.error.as_deref())
    }

    /// Operations that currently carry an error, with their messages.
    pub fn errors(&self) -> Vec<(Operation, &str)> {
        self.0
            .iter()
            .filter_map(|(op, slot)| slot.error.as_deref().map(|e| (*op, e)))
            .collect()
    }
}
