//! [`FormulaStore`] -- single source of truth for the draft under construction.
//!
//! The store is a single-writer state container. It is mutated only through
//! its command methods, each of which runs to completion and leaves the draft
//! consistent: ingredient ids unique, line and step `order` exactly `1..N`,
//! percentages clamped to `[0, 100]` with one decimal. Commands never fail on
//! malformed input; they normalise it or do nothing and return `false`.
//!
//! Every command that dirties the draft writes it to the recoverable
//! [`DraftStorage`] slot (best effort), and every command that changes the
//! ingredient set schedules a compatibility recheck through the injected
//! [`RecheckSink`]. Recheck responses are tagged with a generation number and
//! only the latest one is applied.

use tracing::{debug, info, warn};

use formulary_core::catalog::{self, CatalogIngredient};
use formulary_core::enums::{Operation, ProductType, WizardStep};
use formulary_core::formula::{
    CompatibilityIssue, Formula, GeneratedFormula, IngredientLine, ManufacturingStep,
    NormalizeReport,
};
use formulary_core::percent;

use crate::status::OperationStatus;
use crate::traits::{CompatibilityRequest, DraftStorage, RecheckSink};

/// One scalar field of the draft, with its new value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Name(String),
    Description(String),
    ProductType(ProductType),
    IsPublic(bool),
    TotalWeight(f64),
}

impl FieldUpdate {
    /// Name of the field being updated.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Description(_) => "description",
            Self::ProductType(_) => "type",
            Self::IsPublic(_) => "isPublic",
            Self::TotalWeight(_) => "totalWeight",
        }
    }
}

/// Wizard position and dirty flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WizardState {
    pub current_step: WizardStep,
    /// Draft mutated since the last successful save or reset.
    pub is_dirty: bool,
}

/// State container for the in-progress formula.
pub struct FormulaStore {
    draft: Formula,
    catalog: Vec<CatalogIngredient>,
    phases: Vec<String>,
    functions: Vec<String>,
    compatibility_issues: Vec<CompatibilityIssue>,
    status: OperationStatus,
    wizard: WizardState,

    /// Bumped whenever the draft is replaced wholesale (reset, restore).
    epoch: u64,
    /// Generation of the most recently dispatched compatibility check.
    compat_dispatched: u64,
    /// Generation whose response (or cancellation) was last accepted.
    compat_settled: u64,

    storage: Box<dyn DraftStorage>,
    recheck: Box<dyn RecheckSink>,
}

impl std::fmt::Debug for FormulaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormulaStore")
            .field("draft", &self.draft)
            .field("wizard", &self.wizard)
            .field("epoch", &self.epoch)
            .field("compat_dispatched", &self.compat_dispatched)
            .field("compat_settled", &self.compat_settled)
            .finish_non_exhaustive()
    }
}

impl FormulaStore {
    /// Creates a store with an empty draft.
    ///
    /// Call [`FormulaStore::restore`] before anything else to pick up a
    /// recoverable draft from a previous session.
    pub fn new(storage: Box<dyn DraftStorage>, recheck: Box<dyn RecheckSink>) -> Self {
        Self {
            draft: Formula::default(),
            catalog: Vec::new(),
            phases: Vec::new(),
            functions: Vec::new(),
            compatibility_issues: Vec::new(),
            status: OperationStatus::new(),
            wizard: WizardState::default(),
            epoch: 0,
            compat_dispatched: 0,
            compat_settled: 0,
            storage,
            recheck,
        }
    }

    // -- Read access ---------------------------------------------------------

    pub fn draft(&self) -> &Formula {
        &self.draft
    }

    pub fn catalog(&self) -> &[CatalogIngredient] {
        &self.catalog
    }

    pub fn phases(&self) -> &[String] {
        &self.phases
    }

    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    pub fn compatibility_issues(&self) -> &[CompatibilityIssue] {
        &self.compatibility_issues
    }

    pub fn status(&self) -> &OperationStatus {
        &self.status
    }

    pub fn wizard(&self) -> WizardState {
        self.wizard
    }

    pub fn current_step(&self) -> WizardStep {
        self.wizard.current_step
    }

    pub fn is_dirty(&self) -> bool {
        self.wizard.is_dirty
    }

    /// Draft version; changes when the draft is replaced by reset or restore.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Generation of the latest dispatched compatibility check.
    pub fn compatibility_generation(&self) -> u64 {
        self.compat_dispatched
    }

    /// `true` while the latest dispatched compatibility check has not reported.
    pub fn compatibility_pending(&self) -> bool {
        self.compat_settled < self.compat_dispatched
    }

    // -- Session start -------------------------------------------------------

    /// Replaces the empty default draft with the recoverable one, if any.
    ///
    /// A recovered draft is repaired defensively (duplicates dropped keeping
    /// the first occurrence, orders renumbered) instead of failing startup.
    /// Unreadable slots are logged and ignored. Returns the repair report when
    /// a draft was restored.
    pub fn restore(&mut self) -> Option<NormalizeReport> {
        let mut draft = match self.storage.load() {
            Ok(Some(draft)) => draft,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable recoverable draft");
                return None;
            }
        };

        let report = draft.normalize();
        if !report.is_clean() {
            warn!(?report, "repaired recovered draft");
        }
        info!(
            name = %draft.name,
            ingredients = draft.ingredients.len(),
            steps = draft.steps.len(),
            "restored recoverable draft"
        );

        self.draft = draft;
        self.epoch += 1;
        self.wizard.is_dirty = true;
        if !report.is_clean() {
            self.persist();
        }
        if !self.draft.ingredients.is_empty() {
            self.request_compatibility();
        }
        Some(report)
    }

    // -- Reference data ------------------------------------------------------

    /// Installs the session's ingredient catalog, coercing malformed entries.
    pub fn set_catalog(&mut self, entries: Vec<CatalogIngredient>) {
        let (cleaned, removed) = catalog::sanitize_catalog(entries);
        if removed > 0 {
            warn!(removed, "dropped malformed catalog entries");
        }
        debug!(entries = cleaned.len(), "catalog loaded");
        self.catalog = cleaned;
    }

    pub fn set_phases(&mut self, phases: Vec<String>) {
        self.phases = phases;
    }

    pub fn set_functions(&mut self, functions: Vec<String>) {
        self.functions = functions;
    }

    pub fn find_catalog_entry(&self, id: &str) -> Option<&CatalogIngredient> {
        catalog::find(&self.catalog, id)
    }

    // -- Operation status ----------------------------------------------------

    pub fn begin_operation(&mut self, op: Operation) {
        self.status.begin(op);
    }

    pub fn complete_operation(&mut self, op: Operation) {
        self.status.succeed(op);
    }

    pub fn fail_operation(&mut self, op: Operation, message: impl Into<String>) {
        let message = message.into();
        warn!(operation = %op, error = %message, "operation failed");
        self.status.fail(op, message);
    }

    /// Clears a displayed error. Returns `true` if one was set.
    pub fn dismiss_error(&mut self, op: Operation) -> bool {
        self.status.dismiss(op)
    }

    // -- Draft commands ------------------------------------------------------

    /// Replaces one scalar field of the draft. No validation here.
    pub fn update_field(&mut self, update: FieldUpdate) {
        debug!(field = update.field(), "update field");
        match update {
            FieldUpdate::Name(name) => self.draft.name = name,
            FieldUpdate::Description(description) => self.draft.description = description,
            FieldUpdate::ProductType(product_type) => self.draft.product_type = product_type,
            FieldUpdate::IsPublic(is_public) => self.draft.is_public = is_public,
            FieldUpdate::TotalWeight(grams) => self.draft.total_weight = grams,
        }
        self.touch();
    }

    /// Appends a catalog ingredient to the draft.
    ///
    /// Does nothing (returns `false`) if the ingredient is already present.
    /// Without an explicit percentage the role-based default applies; an
    /// explicit one is clamped and rounded.
    pub fn add_ingredient(&mut self, entry: &CatalogIngredient, percentage: Option<f64>) -> bool {
        if self.draft.contains_ingredient(&entry.id) {
            debug!(ingredient = %entry.id, "ingredient already in draft");
            return false;
        }

        let pct = match percentage {
            Some(value) => percent::clamp_percentage(value),
            None => percent::default_percentage(entry, self.draft.total_percentage()),
        };

        let mut line = IngredientLine::from_catalog(entry, pct);
        line.order = self.draft.ingredients.len() as u32 + 1;
        debug!(ingredient = %entry.id, percentage = pct, order = line.order, "add ingredient");
        self.draft.ingredients.push(line);

        self.touch();
        self.request_compatibility();
        true
    }

    /// Looks the id up in the loaded catalog and adds it.
    ///
    /// Returns `false` for ids missing from the catalog.
    pub fn add_ingredient_by_id(&mut self, id: &str, percentage: Option<f64>) -> bool {
        match catalog::find(&self.catalog, id).cloned() {
            Some(entry) => self.add_ingredient(&entry, percentage),
            None => {
                debug!(ingredient = %id, "ingredient not in catalog");
                false
            }
        }
    }

    /// Removes a line and renumbers the rest. `false` if not present.
    pub fn remove_ingredient(&mut self, ingredient_id: &str) -> bool {
        let before = self.draft.ingredients.len();
        self.draft
            .ingredients
            .retain(|l| l.ingredient_id != ingredient_id);
        if self.draft.ingredients.len() == before {
            return false;
        }
        debug!(ingredient = %ingredient_id, "remove ingredient");
        self.draft.renumber_ingredients();

        self.touch();
        self.request_compatibility();
        true
    }

    /// Sets a line's percentage from raw user input.
    ///
    /// Non-numeric input becomes `0`; the value is clamped to `[0, 100]` and
    /// rounded. A zero percentage keeps the line. `false` if not present.
    pub fn update_ingredient_percentage(&mut self, ingredient_id: &str, raw: &str) -> bool {
        let pct = percent::parse_percentage(raw);
        let Some(line) = self
            .draft
            .ingredients
            .iter_mut()
            .find(|l| l.ingredient_id == ingredient_id)
        else {
            return false;
        };
        debug!(ingredient = %ingredient_id, raw, percentage = pct, "update percentage");
        line.percentage = pct;
        self.touch();
        true
    }

    /// Moves a line to a 1-based position (clamped to the list) and renumbers.
    pub fn move_ingredient(&mut self, ingredient_id: &str, position: usize) -> bool {
        let Some(from) = self
            .draft
            .ingredients
            .iter()
            .position(|l| l.ingredient_id == ingredient_id)
        else {
            return false;
        };
        let to = position.clamp(1, self.draft.ingredients.len()) - 1;
        if from == to {
            return true;
        }
        let line = self.draft.ingredients.remove(from);
        self.draft.ingredients.insert(to, line);
        self.draft.renumber_ingredients();
        debug!(ingredient = %ingredient_id, position = to + 1, "move ingredient");
        self.touch();
        true
    }

    /// Appends a manufacturing step. Blank descriptions are rejected.
    pub fn add_step(&mut self, description: &str) -> bool {
        let description = description.trim();
        if description.is_empty() {
            return false;
        }
        let order = self.draft.steps.len() as u32 + 1;
        debug!(order, "add step");
        self.draft
            .steps
            .push(ManufacturingStep::new(description, order));
        self.touch();
        true
    }

    /// Replaces the description of the step with this order.
    ///
    /// `false` if no such step exists or the new description is blank.
    pub fn update_step(&mut self, order: u32, description: &str) -> bool {
        let description = description.trim();
        if description.is_empty() {
            return false;
        }
        let Some(step) = self.draft.steps.iter_mut().find(|s| s.order == order) else {
            return false;
        };
        debug!(order, "update step");
        step.description = description.to_string();
        self.touch();
        true
    }

    /// Removes the step with this order and renumbers the rest.
    pub fn remove_step(&mut self, order: u32) -> bool {
        let before = self.draft.steps.len();
        self.draft.steps.retain(|s| s.order != order);
        if self.draft.steps.len() == before {
            return false;
        }
        debug!(order, "remove step");
        self.draft.renumber_steps();
        self.touch();
        true
    }

    /// Discards the draft and returns the wizard to its first step.
    ///
    /// Clears compatibility issues and the dirty flag, purges the recoverable
    /// slot, and invalidates any in-flight compatibility or generation result.
    pub fn reset_draft(&mut self) {
        info!("reset draft");
        self.draft = Formula::default();
        self.compatibility_issues.clear();
        self.wizard = WizardState::default();
        self.epoch += 1;
        self.compat_dispatched += 1;
        self.compat_settled = self.compat_dispatched;
        self.status.succeed(Operation::CompatibilityChecking);
        self.purge();
    }

    /// Merges a generated formula into the draft.
    ///
    /// An existing non-empty name wins over the generated one; every other
    /// field the generator supplied replaces the draft's value. Generated
    /// lines and steps are repaired like recovered ones.
    pub fn apply_generated_formula(&mut self, generated: GeneratedFormula) {
        let GeneratedFormula {
            name,
            description,
            product_type,
            is_public,
            total_weight,
            ingredients,
            steps,
        } = generated;

        if let Some(name) = name {
            if self.draft.name.trim().is_empty() {
                self.draft.name = name;
            } else {
                debug!(kept = %self.draft.name, discarded = %name, "keeping existing name");
            }
        }
        if let Some(description) = description {
            self.draft.description = description;
        }
        if let Some(product_type) = product_type {
            self.draft.product_type = product_type;
        }
        if let Some(is_public) = is_public {
            self.draft.is_public = is_public;
        }
        if let Some(total_weight) = total_weight {
            self.draft.total_weight = total_weight;
        }

        let ingredients_changed = ingredients.is_some();
        if let Some(lines) = ingredients {
            self.draft.ingredients = lines
                .into_iter()
                .map(|mut line| {
                    if line.ingredient.is_none() {
                        line.ingredient =
                            catalog::find(&self.catalog, &line.ingredient_id).cloned();
                    }
                    line
                })
                .collect();
        }
        if let Some(steps) = steps {
            self.draft.steps = steps;
        }

        let report = self.draft.normalize();
        if !report.is_clean() {
            warn!(?report, "repaired generated formula");
        }
        info!(
            ingredients = self.draft.ingredients.len(),
            steps = self.draft.steps.len(),
            "applied generated formula"
        );

        self.touch();
        if ingredients_changed {
            self.request_compatibility();
        }
    }

    /// Moves the wizard pointer. Validation is the controller's job.
    pub fn set_step(&mut self, step: WizardStep) {
        debug!(from = %self.wizard.current_step, to = %step, "set step");
        self.wizard.current_step = step;
    }

    /// Records a successful save: clears the dirty flag and purges the slot.
    pub fn mark_saved(&mut self) {
        info!(name = %self.draft.name, "draft saved");
        self.wizard.is_dirty = false;
        self.purge();
    }

    // -- Compatibility -------------------------------------------------------

    /// Dispatches a compatibility recheck for the current ingredient set.
    ///
    /// Returns the generation assigned to the request.
    pub fn request_compatibility(&mut self) -> u64 {
        self.compat_dispatched += 1;
        let request = CompatibilityRequest {
            generation: self.compat_dispatched,
            ingredient_ids: self.draft.ingredient_ids(),
        };
        self.status.begin(Operation::CompatibilityChecking);
        debug!(generation = request.generation, "schedule compatibility check");
        self.recheck.schedule(request);
        self.compat_dispatched
    }

    /// Applies a compatibility response if it belongs to the latest request.
    ///
    /// Responses for superseded generations are discarded and `false` is
    /// returned. A failed check records the error and keeps the previous
    /// issue list.
    pub fn apply_compatibility(
        &mut self,
        generation: u64,
        result: Result<Vec<CompatibilityIssue>, String>,
    ) -> bool {
        if generation != self.compat_dispatched {
            debug!(
                generation,
                latest = self.compat_dispatched,
                "discarding stale compatibility result"
            );
            return false;
        }
        self.compat_settled = generation;
        match result {
            Ok(issues) => {
                debug!(generation, issues = issues.len(), "compatibility updated");
                self.compatibility_issues = issues;
                self.status.succeed(Operation::CompatibilityChecking);
            }
            Err(message) => self.fail_operation(Operation::CompatibilityChecking, message),
        }
        true
    }

    // -- Internal helpers ----------------------------------------------------

    /// Marks the draft dirty and writes it to the recoverable slot.
    fn touch(&mut self) {
        self.wizard.is_dirty = true;
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.storage.save(&self.draft) {
            warn!(error = %e, "failed to persist recoverable draft");
        }
    }

    fn purge(&self) {
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "failed to purge recoverable draft");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDraftStorage;
    use crate::traits::NoopRecheck;
    use formulary_core::formula::FormulaBuilder;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    /// Sink that records every scheduled request.
    #[derive(Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<CompatibilityRequest>>>);

    impl RecordingSink {
        fn requests(&self) -> Vec<CompatibilityRequest> {
            self.0.lock().unwrap().clone()
        }
    }

    impl RecheckSink for RecordingSink {
        fn schedule(&self, request: CompatibilityRequest) {
            self.0.lock().unwrap().push(request);
        }
    }

    fn store() -> (FormulaStore, MemoryDraftStorage) {
        let storage = MemoryDraftStorage::new();
        let store = FormulaStore::new(Box::new(storage.clone()), Box::new(NoopRecheck));
        (store, storage)
    }

    fn entry(id: &str) -> CatalogIngredient {
        CatalogIngredient::new(id, id)
    }

    fn orders(store: &FormulaStore) -> Vec<u32> {
        store.draft().ingredients.iter().map(|l| l.order).collect()
    }

    #[test]
    fn starts_empty_and_clean() {
        let (store, storage) = store();
        assert_eq!(store.draft(), &Formula::default());
        assert_eq!(store.current_step(), WizardStep::BasicDetails);
        assert!(!store.is_dirty());
        assert!(!storage.is_populated());
    }

    #[test]
    fn update_field_marks_dirty_and_persists() {
        let (mut store, storage) = store();
        store.update_field(FieldUpdate::Name("Hydra Serum".into()));
        store.update_field(FieldUpdate::ProductType(ProductType::Serum));
        store.update_field(FieldUpdate::TotalWeight(250.0));

        assert!(store.is_dirty());
        let saved = storage.snapshot().unwrap();
        assert_eq!(saved.name, "Hydra Serum");
        assert_eq!(saved.product_type, ProductType::Serum);
        assert_eq!(saved.total_weight, 250.0);
    }

    #[test]
    fn add_ingredient_appends_with_next_order() {
        let (mut store, _) = store();
        assert!(store.add_ingredient(&entry("a"), Some(10.0)));
        assert!(store.add_ingredient(&entry("b"), Some(20.0)));
        assert_eq!(orders(&store), vec![1, 2]);
        assert_eq!(
            store.draft().line("a").unwrap().ingredient.as_ref().unwrap().id,
            "a"
        );
    }

    #[test]
    fn add_ingredient_twice_is_a_noop() {
        let (mut store, _) = store();
        assert!(store.add_ingredient(&entry("a"), Some(10.0)));
        let before = store.draft().clone();
        assert!(!store.add_ingredient(&entry("a"), Some(50.0)));
        assert_eq!(store.draft(), &before);
    }

    #[test]
    fn explicit_percentage_is_clamped() {
        let (mut store, _) = store();
        store.add_ingredient(&entry("a"), Some(123.456));
        store.add_ingredient(&entry("b"), Some(-4.0));
        store.add_ingredient(&entry("c"), Some(3.14159));
        let pcts: Vec<f64> = store.draft().ingredients.iter().map(|l| l.percentage).collect();
        assert_eq!(pcts, vec![100.0, 0.0, 3.1]);
    }

    #[test]
    fn default_percentage_uses_remaining_room() {
        let (mut store, _) = store();
        store.add_ingredient(&entry("a"), Some(97.0));
        store.add_ingredient(&entry("b"), None);
        assert_eq!(store.draft().line("b").unwrap().percentage, 3.0);
    }

    #[test]
    fn add_by_id_requires_catalog_entry() {
        let (mut store, _) = store();
        store.set_catalog(vec![entry("water")]);
        assert!(store.add_ingredient_by_id("water", None));
        assert!(!store.add_ingredient_by_id("ghost", None));
        assert_eq!(store.draft().line("water").unwrap().percentage, 100.0);
    }

    #[test]
    fn remove_ingredient_renumbers() {
        let (mut store, _) = store();
        for id in ["a", "b", "c", "d"] {
            store.add_ingredient(&entry(id), Some(5.0));
        }
        assert!(store.remove_ingredient("b"));
        assert_eq!(store.draft().ingredient_ids(), vec!["a", "c", "d"]);
        assert_eq!(orders(&store), vec![1, 2, 3]);
        assert!(!store.remove_ingredient("b"));
    }

    #[test]
    fn mixed_add_remove_keeps_invariants() {
        let (mut store, _) = store();
        let ops: &[(&str, bool)] = &[
            ("a", true),
            ("b", true),
            ("a", true),
            ("c", true),
            ("b", false),
            ("d", true),
            ("a", false),
            ("b", true),
            ("c", false),
            ("e", true),
            ("d", false),
        ];
        for (id, add) in ops {
            if *add {
                store.add_ingredient(&entry(id), Some(1.0));
            } else {
                store.remove_ingredient(id);
            }
            assert!(store.draft().is_consistent(), "after {id} {add}");
        }
        assert_eq!(store.draft().ingredient_ids(), vec!["b", "e"]);
    }

    /// Asserts unique ingredient ids and dense 1..=N orders on both lists.
    fn assert_dense(store: &FormulaStore, context: &str) {
        let draft = store.draft();
        let mut ids = draft.ingredient_ids();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), draft.ingredients.len(), "duplicate id {context}");
        let expected: Vec<u32> = (1..=draft.ingredients.len() as u32).collect();
        assert_eq!(orders(store), expected, "ingredient orders {context}");
        let steps: Vec<u32> = draft.steps.iter().map(|s| s.order).collect();
        let expected: Vec<u32> = (1..=draft.steps.len() as u32).collect();
        assert_eq!(steps, expected, "step orders {context}");
    }

    #[test]
    fn seeded_edit_sequences_keep_lists_dense() {
        const IDS: [&str; 5] = ["a", "b", "c", "d", "e"];

        for seed in [1_u64, 7, 42, 1234, 0xdead_beef] {
            let (mut store, _) = store();
            let mut state = seed;
            for i in 0..80 {
                // Small LCG keeps every sequence reproducible.
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                let roll = (state >> 33) as usize;
                let id = IDS[roll % IDS.len()];
                let steps = store.draft().steps.len() as u32;
                match (roll / IDS.len()) % 6 {
                    0 | 1 => {
                        store.add_ingredient(&entry(id), Some(1.0));
                    }
                    2 => {
                        store.remove_ingredient(id);
                    }
                    3 => {
                        store.move_ingredient(id, roll % 4);
                    }
                    4 => {
                        store.add_step(&format!("step {i}"));
                    }
                    _ => {
                        store.remove_step(roll as u32 % (steps + 2));
                    }
                }
                assert_dense(&store, &format!("seed {seed} op {i}"));
            }
        }
    }

    #[test]
    fn scripted_step_sequences_keep_orders_dense() {
        enum Op {
            Add(&'static str),
            Remove(u32),
        }
        use Op::{Add, Remove};

        let cases: &[(&[Op], &[&str])] = &[
            (&[Add("x"), Add("y"), Remove(1), Add("z")], &["y", "z"]),
            (&[Add("x"), Remove(2), Remove(0), Add("  "), Add("y")], &["x", "y"]),
            (&[Add("x"), Add("y"), Add("z"), Remove(2), Remove(2)], &["x"]),
            (&[Remove(1), Add("x"), Remove(1), Add("y")], &["y"]),
        ];
        for (n, (ops, expected)) in cases.iter().enumerate() {
            let (mut store, _) = store();
            for op in *ops {
                match op {
                    Add(text) => {
                        store.add_step(text);
                    }
                    Remove(order) => {
                        store.remove_step(*order);
                    }
                }
                assert_dense(&store, &format!("case {n}"));
            }
            let texts: Vec<&str> = store
                .draft()
                .steps
                .iter()
                .map(|s| s.description.as_str())
                .collect();
            assert_eq!(texts, expected.to_vec(), "case {n}");
        }
    }

    #[test]
    fn percentage_input_normalisation() {
        let (mut store, _) = store();
        store.add_ingredient(&entry("a"), Some(10.0));

        assert!(store.update_ingredient_percentage("a", "abc"));
        assert_eq!(store.draft().line("a").unwrap().percentage, 0.0);

        store.update_ingredient_percentage("a", "150");
        assert_eq!(store.draft().line("a").unwrap().percentage, 100.0);

        store.update_ingredient_percentage("a", "-5");
        assert_eq!(store.draft().line("a").unwrap().percentage, 0.0);

        store.update_ingredient_percentage("a", "12.34");
        assert_eq!(store.draft().line("a").unwrap().percentage, 12.3);

        // Zero keeps the line.
        store.update_ingredient_percentage("a", "0");
        assert!(store.draft().contains_ingredient("a"));

        assert!(!store.update_ingredient_percentage("ghost", "5"));
    }

    #[test]
    fn move_ingredient_reorders() {
        let (mut store, _) = store();
        for id in ["a", "b", "c"] {
            store.add_ingredient(&entry(id), Some(5.0));
        }
        assert!(store.move_ingredient("c", 1));
        assert_eq!(store.draft().ingredient_ids(), vec!["c", "a", "b"]);
        assert!(store.move_ingredient("c", 99));
        assert_eq!(store.draft().ingredient_ids(), vec!["a", "b", "c"]);
        assert_eq!(orders(&store), vec![1, 2, 3]);
        assert!(!store.move_ingredient("ghost", 1));
    }

    #[test]
    fn steps_add_update_remove() {
        let (mut store, _) = store();
        assert!(store.add_step("Weigh phase A"));
        assert!(store.add_step("  Heat to 75C  "));
        assert!(!store.add_step("   "));
        assert!(store.add_step("Cool down"));

        assert!(store.update_step(2, "Heat to 70C"));
        assert!(!store.update_step(9, "nope"));
        assert!(!store.update_step(1, " "));
        assert_eq!(store.draft().step(2).unwrap().description, "Heat to 70C");

        assert!(store.remove_step(1));
        let steps: Vec<(u32, &str)> = store
            .draft()
            .steps
            .iter()
            .map(|s| (s.order, s.description.as_str()))
            .collect();
        assert_eq!(steps, vec![(1, "Heat to 70C"), (2, "Cool down")]);
        assert!(!store.remove_step(7));
    }

    #[test]
    fn step_orders_stay_contiguous() {
        let (mut store, _) = store();
        for i in 0..6 {
            store.add_step(&format!("step {i}"));
        }
        for order in [6, 1, 3] {
            store.remove_step(order);
            assert!(store.draft().is_consistent());
        }
        store.add_step("last");
        let orders: Vec<u32> = store.draft().steps.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4]);
    }

    #[test]
    fn reset_restores_defaults_and_purges() {
        let (mut store, storage) = store();
        store.update_field(FieldUpdate::Name("x".into()));
        store.add_ingredient(&entry("a"), Some(5.0));
        store.set_step(WizardStep::Ingredients);
        store.apply_compatibility(
            store.compatibility_generation(),
            Ok(vec![CompatibilityIssue {
                first: "a".into(),
                second: "b".into(),
                description: "x".into(),
            }]),
        );
        assert!(storage.is_populated());

        let epoch = store.epoch();
        store.reset_draft();

        assert_eq!(store.draft(), &Formula::default());
        assert_eq!(store.current_step(), WizardStep::BasicDetails);
        assert!(!store.is_dirty());
        assert!(store.compatibility_issues().is_empty());
        assert!(!storage.is_populated());
        assert!(store.epoch() > epoch);
    }

    #[test]
    fn generated_formula_keeps_existing_name() {
        let (mut store, _) = store();
        store.update_field(FieldUpdate::Name("My Serum".into()));
        store.apply_generated_formula(GeneratedFormula {
            name: Some("Gen Name".into()),
            description: Some("generated".into()),
            product_type: Some(ProductType::Serum),
            ingredients: Some(vec![
                IngredientLine::new("water", 90.0),
                IngredientLine::new("glycerin", 10.0),
            ]),
            ..GeneratedFormula::default()
        });

        let draft = store.draft();
        assert_eq!(draft.name, "My Serum");
        assert_eq!(draft.description, "generated");
        assert_eq!(draft.product_type, ProductType::Serum);
        assert_eq!(draft.ingredient_ids(), vec!["water", "glycerin"]);
        assert_eq!(orders(&store), vec![1, 2]);
        assert!(store.is_dirty());
    }

    #[test]
    fn generated_formula_fills_empty_name_and_replaces_steps() {
        let (mut store, _) = store();
        store.add_step("old step");
        store.apply_generated_formula(GeneratedFormula {
            name: Some("Gen Name".into()),
            steps: Some(vec![ManufacturingStep::new("new step", 1)]),
            ..GeneratedFormula::default()
        });
        assert_eq!(store.draft().name, "Gen Name");
        assert_eq!(store.draft().steps.len(), 1);
        assert_eq!(store.draft().steps[0].description, "new step");
    }

    #[test]
    fn generated_lines_pick_up_catalog_display_copy() {
        let (mut store, _) = store();
        store.set_catalog(vec![CatalogIngredient::new("water", "Water").with_phase("A")]);
        store.apply_generated_formula(GeneratedFormula {
            ingredients: Some(vec![IngredientLine::new("water", 100.0)]),
            ..GeneratedFormula::default()
        });
        assert_eq!(store.draft().ingredients[0].display_name(), "Water");
    }

    #[test]
    fn ingredient_mutations_schedule_rechecks() {
        let sink = RecordingSink::default();
        let mut store =
            FormulaStore::new(Box::new(MemoryDraftStorage::new()), Box::new(sink.clone()));
        store.add_ingredient(&entry("a"), Some(5.0));
        store.add_ingredient(&entry("b"), Some(5.0));
        store.update_ingredient_percentage("a", "7");
        store.remove_ingredient("a");

        let requests = sink.requests();
        let generations: Vec<u64> = requests.iter().map(|r| r.generation).collect();
        assert_eq!(generations, vec![1, 2, 3]);
        assert_eq!(requests[2].ingredient_ids, vec!["b"]);
        assert!(store.compatibility_pending());
    }

    #[test]
    fn stale_compatibility_results_are_discarded() {
        let (mut store, _) = store();
        store.add_ingredient(&entry("a"), Some(5.0));
        let first = store.compatibility_generation();
        store.add_ingredient(&entry("b"), Some(5.0));
        let second = store.compatibility_generation();

        let issue = CompatibilityIssue {
            first: "a".into(),
            second: "b".into(),
            description: "pH clash".into(),
        };
        assert!(store.apply_compatibility(second, Ok(vec![issue.clone()])));
        assert!(!store.apply_compatibility(first, Ok(vec![])));
        assert_eq!(store.compatibility_issues(), &[issue]);
        assert!(!store.compatibility_pending());
    }

    #[test]
    fn compatibility_after_reset_is_ignored() {
        let (mut store, _) = store();
        store.add_ingredient(&entry("a"), Some(5.0));
        let generation = store.compatibility_generation();
        store.reset_draft();
        assert!(!store.apply_compatibility(generation, Ok(vec![])));
        assert!(!store.compatibility_pending());
    }

    #[test]
    fn failed_compatibility_keeps_issues_and_records_error() {
        let (mut store, _) = store();
        store.add_ingredient(&entry("a"), Some(5.0));
        let generation = store.compatibility_generation();
        assert!(store.apply_compatibility(generation, Err("service down".into())));
        assert_eq!(
            store.status().error(Operation::CompatibilityChecking),
            Some("service down")
        );
    }

    #[test]
    fn restore_dedupes_recovered_draft() {
        let recovered = FormulaBuilder::new("Recovered")
            .line("water", 80.0)
            .line("glycerin", 5.0)
            .line("water", 15.0)
            .build();
        let storage = MemoryDraftStorage::with_draft(recovered);
        let mut store = FormulaStore::new(Box::new(storage.clone()), Box::new(NoopRecheck));

        let report = store.restore().unwrap();
        assert_eq!(report.duplicate_ingredients, 1);
        assert_eq!(store.draft().name, "Recovered");
        assert_eq!(store.draft().ingredient_ids(), vec!["water", "glycerin"]);
        assert!(store.draft().is_consistent());
        assert!(store.is_dirty());
        assert_eq!(storage.snapshot().unwrap().ingredients.len(), 2);
    }

    #[test]
    fn restore_without_slot_keeps_empty_draft() {
        let (mut store, _) = store();
        assert!(store.restore().is_none());
        assert!(!store.is_dirty());
    }

    #[test]
    fn mark_saved_clears_dirty_and_slot() {
        let (mut store, storage) = store();
        store.update_field(FieldUpdate::Name("x".into()));
        store.mark_saved();
        assert!(!store.is_dirty());
        assert!(!storage.is_populated());
        assert_eq!(store.draft().name, "x");
    }

    #[test]
    fn dismiss_error_clears_slot() {
        let (mut store, _) = store();
        store.fail_operation(Operation::FormulaGeneration, "nope");
        assert!(store.dismiss_error(Operation::FormulaGeneration));
        assert!(store.status().error(Operation::FormulaGeneration).is_none());
    }
}
