//! [`WizardController`] -- step ordering, validation and remote flows.
//!
//! The controller owns the [`FormulaStore`] for the session. UI consumers
//! read state and issue draft commands through [`WizardController::store`]
//! and [`WizardController::store_mut`]; step transitions and collaborator
//! calls go through the controller so that a failed remote call never leaves
//! the draft or the step pointer half-updated.
//!
//! Generation and save are split into `begin_*` / `finish_*` halves. The
//! ticket returned by `begin_*` records the draft epoch; a result that
//! arrives after the draft was reset is discarded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use formulary_api::{ApiError, FormulaApi};
use formulary_core::enums::{Operation, WizardStep};
use formulary_core::formula::GeneratedFormula;
use formulary_core::payload::{GenerationRequest, SaveFormulaRequest, SavedFormula};
use formulary_core::validation::{self, ValidationErrors};
use formulary_store::{DraftStorage, FormulaStore};

use crate::scheduler::{CompatibilityOutcome, CompatibilityScheduler};

/// Proof that a generation request was started against a given draft.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTicket {
    epoch: u64,
    pub request: GenerationRequest,
}

/// Proof that a save was started against a given draft.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveTicket {
    epoch: u64,
    pub request: SaveFormulaRequest,
}

/// Drives the five-step formula wizard.
pub struct WizardController {
    store: FormulaStore,
    api: Arc<dyn FormulaApi>,
    compatibility: mpsc::UnboundedReceiver<CompatibilityOutcome>,
    validation_errors: ValidationErrors,
}

impl WizardController {
    /// Wires a store, a compatibility scheduler and the collaborator.
    ///
    /// Compatibility checks are spawned on the tokio runtime that is current
    /// when an ingredient command runs.
    pub fn new(
        api: Arc<dyn FormulaApi>,
        storage: Box<dyn DraftStorage>,
        debounce: Duration,
    ) -> Self {
        let (scheduler, compatibility) = CompatibilityScheduler::new(Arc::clone(&api), debounce);
        let store = FormulaStore::new(storage, Box::new(scheduler));
        Self {
            store,
            api,
            compatibility,
            validation_errors: ValidationErrors::new(),
        }
    }

    pub fn store(&self) -> &FormulaStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut FormulaStore {
        &mut self.store
    }

    pub fn current_step(&self) -> WizardStep {
        self.store.current_step()
    }

    /// Errors from the last rejected transition, keyed by field.
    pub fn validation_errors(&self) -> &ValidationErrors {
        &self.validation_errors
    }

    // -- Session start -------------------------------------------------------

    /// Restores the recoverable draft, then fetches reference data.
    ///
    /// Catalog, phases and functions are fetched concurrently and tracked
    /// under their own operation keys; one failing does not affect the
    /// others. Returns `true` if a recoverable draft was restored.
    pub async fn initialize(&mut self) -> bool {
        let restored = self.store.restore().is_some();

        self.store.begin_operation(Operation::IngredientsFetching);
        self.store.begin_operation(Operation::PhasesFetching);
        self.store.begin_operation(Operation::FunctionsFetching);

        let (catalog, phases, functions) = tokio::join!(
            self.api.fetch_catalog(),
            self.api.fetch_phases(),
            self.api.fetch_functions(),
        );

        match catalog {
            Ok(entries) => {
                self.store.set_catalog(entries);
                self.store.complete_operation(Operation::IngredientsFetching);
            }
            Err(e) => self
                .store
                .fail_operation(Operation::IngredientsFetching, e.to_string()),
        }
        match phases {
            Ok(list) => {
                self.store.set_phases(list);
                self.store.complete_operation(Operation::PhasesFetching);
            }
            Err(e) => self
                .store
                .fail_operation(Operation::PhasesFetching, e.to_string()),
        }
        match functions {
            Ok(list) => {
                self.store.set_functions(list);
                self.store.complete_operation(Operation::FunctionsFetching);
            }
            Err(e) => self
                .store
                .fail_operation(Operation::FunctionsFetching, e.to_string()),
        }

        info!(
            restored,
            catalog = self.store.catalog().len(),
            "wizard initialized"
        );
        restored
    }

    // -- Navigation ----------------------------------------------------------

    /// Validates the current step and advances on success.
    ///
    /// On failure the validation errors are recorded and the step pointer
    /// does not move. On the Review step there is nothing to advance to and
    /// `false` is returned without touching the errors.
    pub fn next(&mut self) -> bool {
        let current = self.store.current_step();
        let Some(target) = current.next() else {
            return false;
        };

        let errors = validation::validate_step(current, self.store.draft());
        if !errors.is_empty() {
            debug!(step = %current, fields = ?errors.fields(), "step validation failed");
            self.validation_errors = errors;
            return false;
        }

        self.validation_errors.clear();
        self.store.set_step(target);
        true
    }

    /// Moves back one step without validation, stopping at the first step.
    pub fn previous(&mut self) {
        self.validation_errors.clear();
        let target = self.store.current_step().previous();
        self.store.set_step(target);
    }

    /// Jumps to `target`.
    ///
    /// Going backward always succeeds. Going forward validates the exit
    /// rule of every step passed over; on the first failure the errors are
    /// recorded, the pointer stays where it was and `false` is returned.
    pub fn go_to(&mut self, target: WizardStep) -> bool {
        let current = self.store.current_step();
        if target <= current {
            self.validation_errors.clear();
            self.store.set_step(target);
            return true;
        }

        for index in current.index()..target.index() {
            let Some(step) = WizardStep::from_index(index) else {
                break;
            };
            let errors = validation::validate_step(step, self.store.draft());
            if !errors.is_empty() {
                debug!(step = %step, target = %target, "jump blocked by validation");
                self.validation_errors = errors;
                return false;
            }
        }

        self.validation_errors.clear();
        self.store.set_step(target);
        true
    }

    // -- AI recommendation ---------------------------------------------------

    /// Default generation request for the current draft.
    pub fn generation_request(&self) -> GenerationRequest {
        GenerationRequest::new(self.store.draft().product_type.clone())
    }

    /// Marks generation as in flight.
    pub fn begin_generation(&mut self, request: GenerationRequest) -> GenerationTicket {
        self.store.begin_operation(Operation::FormulaGeneration);
        GenerationTicket {
            epoch: self.store.epoch(),
            request,
        }
    }

    /// Applies a generation result.
    ///
    /// On success the generated formula is merged into the draft and, if
    /// the wizard is on the AI step, it advances past it. On failure only
    /// the `formulaGeneration` error slot changes. Results for a draft that
    /// was reset in the meantime are dropped. Returns `true` if the draft
    /// was updated.
    pub fn finish_generation(
        &mut self,
        ticket: GenerationTicket,
        result: Result<GeneratedFormula, ApiError>,
    ) -> bool {
        if ticket.epoch != self.store.epoch() {
            debug!("discarding generation result for a replaced draft");
            self.store.complete_operation(Operation::FormulaGeneration);
            return false;
        }

        match result {
            Ok(generated) => {
                self.store.apply_generated_formula(generated);
                self.store.complete_operation(Operation::FormulaGeneration);
                if self.store.current_step() == WizardStep::AiRecommendation {
                    self.next();
                }
                true
            }
            Err(e) => {
                self.store
                    .fail_operation(Operation::FormulaGeneration, e.to_string());
                false
            }
        }
    }

    /// Runs the full AI recommendation flow.
    pub async fn generate_recommendation(&mut self, request: GenerationRequest) -> bool {
        let ticket = self.begin_generation(request);
        let api = Arc::clone(&self.api);
        let result = api.generate_formula(&ticket.request).await;
        self.finish_generation(ticket, result)
    }

    // -- Save ----------------------------------------------------------------

    /// Starts a save. Only available on the Review step.
    pub fn begin_save(&mut self) -> Option<SaveTicket> {
        if !self.store.current_step().is_terminal() {
            debug!(step = %self.store.current_step(), "save requested outside review");
            return None;
        }
        self.store.begin_operation(Operation::FormulaSaving);
        Some(SaveTicket {
            epoch: self.store.epoch(),
            request: SaveFormulaRequest::from_draft(self.store.draft()),
        })
    }

    /// Applies a save result.
    ///
    /// Success clears the dirty flag and purges the recoverable slot.
    /// Failure records the `formulaSaving` error and leaves the draft, the
    /// dirty flag, the slot and the step untouched.
    pub fn finish_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<SavedFormula, ApiError>,
    ) -> Option<SavedFormula> {
        match result {
            Ok(saved) => {
                self.store.complete_operation(Operation::FormulaSaving);
                if ticket.epoch == self.store.epoch() {
                    self.store.mark_saved();
                } else {
                    debug!(id = %saved.id, "saved a draft that has since been replaced");
                }
                Some(saved)
            }
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "save failed");
                self.store
                    .fail_operation(Operation::FormulaSaving, e.to_string());
                None
            }
        }
    }

    /// Runs the full save flow. `None` if not on Review or if saving failed.
    pub async fn save(&mut self) -> Option<SavedFormula> {
        let ticket = self.begin_save()?;
        let api = Arc::clone(&self.api);
        let result = api.save_formula(&ticket.request).await;
        self.finish_save(ticket, result)
    }

    // -- Reset ---------------------------------------------------------------

    /// Resets the draft if `confirm` says yes. Returns whether it did.
    pub fn reset_with_confirmation(&mut self, confirm: impl FnOnce() -> bool) -> bool {
        if !confirm() {
            return false;
        }
        self.store.reset_draft();
        self.validation_errors.clear();
        true
    }

    // -- Compatibility -------------------------------------------------------

    /// Applies every compatibility outcome that has already arrived.
    ///
    /// Returns how many were applied (stale ones are discarded, not counted).
    pub fn drain_compatibility(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.compatibility.try_recv() {
            if self.store.apply_compatibility(outcome.generation, outcome.result) {
                applied += 1;
            }
        }
        applied
    }

    /// Waits until the latest dispatched check has been applied.
    ///
    /// Gives up after `timeout` and returns `false`.
    pub async fn await_compatibility(&mut self, timeout: Duration) -> bool {
        let wait = async {
            while self.store.compatibility_pending() {
                match self.compatibility.recv().await {
                    Some(outcome) => {
                        self.store.apply_compatibility(outcome.generation, outcome.result);
                    }
                    None => break,
                }
            }
        };
        if tokio::time::timeout(timeout, wait).await.is_err() {
            warn!(?timeout, "timed out waiting for compatibility check");
        }
        !self.store.compatibility_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use formulary_api::error::Result as ApiResult;
    use formulary_core::catalog::CatalogIngredient;
    use formulary_core::enums::ProductType;
    use formulary_core::formula::{CompatibilityIssue, IngredientLine, ManufacturingStep};
    use formulary_core::validation::ValidationField;
    use formulary_store::{FieldUpdate, MemoryDraftStorage};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WAIT: Duration = Duration::from_secs(5);

    #[derive(Default)]
    struct FakeApi {
        fail_catalog: bool,
        fail_save: bool,
        fail_generation: bool,
        compatibility_calls: AtomicUsize,
        saved: Mutex<Vec<SaveFormulaRequest>>,
    }

    fn catalog() -> Vec<CatalogIngredient> {
        vec![
            CatalogIngredient::new("niacinamide", "Niacinamide").with_function("Active"),
            CatalogIngredient::new("water", "Water"),
            CatalogIngredient::new("ascorbic-acid", "Ascorbic Acid").with_function("Active"),
        ]
    }

    #[async_trait]
    impl FormulaApi for FakeApi {
        async fn fetch_catalog(&self) -> ApiResult<Vec<CatalogIngredient>> {
            if self.fail_catalog {
                return Err(ApiError::unavailable("catalog offline"));
            }
            Ok(catalog())
        }

        async fn fetch_phases(&self) -> ApiResult<Vec<String>> {
            Ok(vec!["Water Phase".into()])
        }

        async fn fetch_functions(&self) -> ApiResult<Vec<String>> {
            Ok(vec!["Active".into()])
        }

        async fn check_compatibility(&self, ids: &[String]) -> ApiResult<Vec<CompatibilityIssue>> {
            self.compatibility_calls.fetch_add(1, Ordering::SeqCst);
            let clash = ids.iter().any(|i| i == "niacinamide")
                && ids.iter().any(|i| i == "ascorbic-acid");
            Ok(if clash {
                vec![CompatibilityIssue {
                    first: "niacinamide".into(),
                    second: "ascorbic-acid".into(),
                    description: "pH clash".into(),
                }]
            } else {
                Vec::new()
            })
        }

        async fn generate_formula(
            &self,
            _request: &GenerationRequest,
        ) -> ApiResult<GeneratedFormula> {
            if self.fail_generation {
                return Err(ApiError::unavailable("generator offline"));
            }
            Ok(GeneratedFormula {
                name: Some("Gen Name".into()),
                ingredients: Some(vec![
                    IngredientLine::new("water", 95.0),
                    IngredientLine::new("niacinamide", 5.0),
                ]),
                steps: Some(vec![ManufacturingStep::new("Mix", 1)]),
                ..GeneratedFormula::default()
            })
        }

        async fn save_formula(&self, request: &SaveFormulaRequest) -> ApiResult<SavedFormula> {
            if self.fail_save {
                return Err(ApiError::unavailable("save endpoint down"));
            }
            self.saved.lock().unwrap().push(request.clone());
            Ok(SavedFormula {
                id: "f-1".into(),
                created_at: None,
                formula: request.clone(),
            })
        }
    }

    fn controller_with(api: FakeApi) -> (WizardController, MemoryDraftStorage, Arc<FakeApi>) {
        let api = Arc::new(api);
        let storage = MemoryDraftStorage::new();
        let controller = WizardController::new(
            api.clone(),
            Box::new(storage.clone()),
            Duration::from_millis(20),
        );
        (controller, storage, api)
    }

    fn fill_basic_details(c: &mut WizardController) {
        c.store_mut()
            .update_field(FieldUpdate::Name("Hydra Serum".into()));
        c.store_mut()
            .update_field(FieldUpdate::ProductType(ProductType::from("serum")));
    }

    /// Puts a valid draft on the Review step.
    async fn ready_for_review(c: &mut WizardController) {
        c.initialize().await;
        fill_basic_details(c);
        assert!(c.next());
        assert!(c.go_to(WizardStep::Ingredients));
        c.store_mut().add_ingredient_by_id("water", Some(100.0));
        assert!(c.next());
        c.store_mut().add_step("Mix everything");
        assert!(c.next());
        assert_eq!(c.current_step(), WizardStep::Review);
    }

    #[tokio::test]
    async fn initialize_loads_reference_data() {
        let (mut c, _, _) = controller_with(FakeApi::default());
        assert!(!c.initialize().await);
        assert_eq!(c.store().catalog().len(), 3);
        assert_eq!(c.store().phases(), &["Water Phase".to_string()]);
        assert!(!c.store().status().is_loading(Operation::IngredientsFetching));
    }

    #[tokio::test]
    async fn failed_catalog_fetch_does_not_block_other_lists() {
        let (mut c, _, _) = controller_with(FakeApi {
            fail_catalog: true,
            ..FakeApi::default()
        });
        c.initialize().await;
        let status = c.store().status();
        assert_eq!(
            status.error(Operation::IngredientsFetching),
            Some("service unavailable: catalog offline")
        );
        assert!(status.error(Operation::PhasesFetching).is_none());
        assert_eq!(c.store().functions().len(), 1);
    }

    #[tokio::test]
    async fn initialize_restores_recoverable_draft_first() {
        let api = Arc::new(FakeApi::default());
        let mut draft = formulary_core::formula::Formula::default();
        draft.name = "Recovered".into();
        let storage = MemoryDraftStorage::with_draft(draft);
        let mut c = WizardController::new(api, Box::new(storage), Duration::ZERO);
        assert!(c.initialize().await);
        assert_eq!(c.store().draft().name, "Recovered");
        assert!(c.store().is_dirty());
    }

    #[tokio::test]
    async fn basic_details_gate() {
        let (mut c, _, _) = controller_with(FakeApi::default());
        assert!(!c.next());
        assert_eq!(
            c.validation_errors().fields(),
            vec![ValidationField::Name, ValidationField::Type]
        );
        assert_eq!(c.current_step(), WizardStep::BasicDetails);

        fill_basic_details(&mut c);
        assert!(c.next());
        assert!(c.validation_errors().is_empty());
        assert_eq!(c.current_step(), WizardStep::AiRecommendation);
    }

    #[tokio::test]
    async fn ingredients_gate() {
        let (mut c, _, _) = controller_with(FakeApi::default());
        c.initialize().await;
        c.store_mut().set_step(WizardStep::Ingredients);

        assert!(!c.next());
        assert!(c.validation_errors().contains(ValidationField::Ingredients));
        assert!(c.validation_errors().contains(ValidationField::TotalPercentage));

        c.store_mut().add_ingredient_by_id("water", Some(90.0));
        c.store_mut().add_ingredient_by_id("niacinamide", Some(4.9));
        assert!(!c.next());
        assert_eq!(c.validation_errors().fields(), vec![ValidationField::TotalPercentage]);

        c.store_mut().update_ingredient_percentage("water", "95.2");
        assert!(c.next());
        assert_eq!(c.current_step(), WizardStep::ManufacturingSteps);
    }

    #[tokio::test]
    async fn steps_gate_and_terminal_next() {
        let (mut c, _, _) = controller_with(FakeApi::default());
        c.store_mut().set_step(WizardStep::ManufacturingSteps);
        assert!(!c.next());
        assert!(c.validation_errors().contains(ValidationField::Steps));

        c.store_mut().add_step("Heat phase A");
        assert!(c.next());
        assert_eq!(c.current_step(), WizardStep::Review);
        assert!(!c.next());
        assert_eq!(c.current_step(), WizardStep::Review);
    }

    #[tokio::test]
    async fn previous_never_validates_and_floors_at_zero() {
        let (mut c, _, _) = controller_with(FakeApi::default());
        c.store_mut().set_step(WizardStep::Ingredients);
        c.previous();
        assert_eq!(c.current_step(), WizardStep::AiRecommendation);
        c.previous();
        c.previous();
        assert_eq!(c.current_step(), WizardStep::BasicDetails);
    }

    #[tokio::test]
    async fn go_to_forward_validates_skipped_steps() {
        let (mut c, _, _) = controller_with(FakeApi::default());
        assert!(!c.go_to(WizardStep::Ingredients));
        assert_eq!(c.current_step(), WizardStep::BasicDetails);
        assert!(c.validation_errors().contains(ValidationField::Name));

        fill_basic_details(&mut c);
        assert!(c.go_to(WizardStep::Ingredients));
        assert_eq!(c.current_step(), WizardStep::Ingredients);
        assert!(c.go_to(WizardStep::BasicDetails));
    }

    #[tokio::test]
    async fn end_to_end_composition() {
        let (mut c, _, _) = controller_with(FakeApi::default());
        c.initialize().await;

        c.store_mut()
            .update_field(FieldUpdate::Name("Hydra Serum".into()));
        c.store_mut()
            .update_field(FieldUpdate::ProductType(ProductType::from("serum")));
        assert!(c.next());
        assert_eq!(c.current_step(), WizardStep::AiRecommendation);

        assert!(c.go_to(WizardStep::Ingredients));
        assert!(c.store_mut().add_ingredient_by_id("niacinamide", None));
        assert_eq!(c.store().draft().line("niacinamide").unwrap().percentage, 2.0);
        assert!(c.store_mut().add_ingredient_by_id("water", None));
        assert_eq!(c.store().draft().line("water").unwrap().percentage, 98.0);
        assert_eq!(c.store().draft().total_percentage(), 100.0);

        assert!(c.next());
        assert_eq!(c.current_step(), WizardStep::ManufacturingSteps);
    }

    #[tokio::test]
    async fn generation_merges_and_advances() {
        let (mut c, _, _) = controller_with(FakeApi::default());
        c.initialize().await;
        c.store_mut()
            .update_field(FieldUpdate::Name("My Serum".into()));
        c.store_mut()
            .update_field(FieldUpdate::ProductType(ProductType::Serum));
        assert!(c.next());

        let request = c.generation_request();
        assert!(c.generate_recommendation(request).await);
        assert_eq!(c.store().draft().name, "My Serum");
        assert_eq!(c.store().draft().ingredient_ids(), vec!["water", "niacinamide"]);
        assert_eq!(
            c.store().draft().ingredients[0].display_name(),
            "Water"
        );
        assert_eq!(c.current_step(), WizardStep::Ingredients);
        assert!(!c.store().status().is_loading(Operation::FormulaGeneration));
    }

    #[tokio::test]
    async fn failed_generation_leaves_draft_alone() {
        let (mut c, _, _) = controller_with(FakeApi {
            fail_generation: true,
            ..FakeApi::default()
        });
        fill_basic_details(&mut c);
        assert!(c.next());
        let before = c.store().draft().clone();

        let request = c.generation_request();
        assert!(!c.generate_recommendation(request).await);
        assert_eq!(c.store().draft(), &before);
        assert_eq!(c.current_step(), WizardStep::AiRecommendation);
        assert!(c.store().status().error(Operation::FormulaGeneration).is_some());

        // Manual editing is still possible.
        assert!(c.go_to(WizardStep::Ingredients));
    }

    #[tokio::test]
    async fn generation_result_after_reset_is_dropped() {
        let (mut c, _, _) = controller_with(FakeApi::default());
        fill_basic_details(&mut c);
        let ticket = c.begin_generation(GenerationRequest::new("serum"));
        assert!(c.reset_with_confirmation(|| true));

        let generated = GeneratedFormula {
            name: Some("Late".into()),
            ..GeneratedFormula::default()
        };
        assert!(!c.finish_generation(ticket, Ok(generated)));
        assert_eq!(c.store().draft().name, "");
        assert!(!c.store().is_dirty());
    }

    #[tokio::test]
    async fn save_success_clears_dirty_and_slot() {
        let (mut c, storage, api) = controller_with(FakeApi::default());
        ready_for_review(&mut c).await;
        assert!(storage.is_populated());

        let saved = c.save().await.unwrap();
        assert_eq!(saved.id, "f-1");
        assert!(!c.store().is_dirty());
        assert!(!storage.is_populated());

        let sent = api.saved.lock().unwrap();
        assert_eq!(sent[0].ingredients[0].ingredient_id, "water");
        assert_eq!(sent[0].steps[0].description, "Mix everything");
    }

    #[tokio::test]
    async fn save_failure_keeps_draft_and_step() {
        let (mut c, storage, _) = controller_with(FakeApi {
            fail_save: true,
            ..FakeApi::default()
        });
        ready_for_review(&mut c).await;

        assert!(c.save().await.is_none());
        assert!(c.store().is_dirty());
        assert!(storage.is_populated());
        assert!(c.store().status().error(Operation::FormulaSaving).is_some());
        assert_eq!(c.current_step(), WizardStep::Review);

        // Navigation stays unrestricted after a failed save.
        c.previous();
        assert_eq!(c.current_step(), WizardStep::ManufacturingSteps);
    }

    #[tokio::test]
    async fn save_outside_review_is_refused() {
        let (mut c, _, api) = controller_with(FakeApi::default());
        fill_basic_details(&mut c);
        assert!(c.save().await.is_none());
        assert!(api.saved.lock().unwrap().is_empty());
        assert!(c.store().status().error(Operation::FormulaSaving).is_none());
    }

    #[tokio::test]
    async fn reset_requires_confirmation() {
        let (mut c, storage, _) = controller_with(FakeApi::default());
        ready_for_review(&mut c).await;

        assert!(!c.reset_with_confirmation(|| false));
        assert_eq!(c.current_step(), WizardStep::Review);

        assert!(c.reset_with_confirmation(|| true));
        assert_eq!(c.current_step(), WizardStep::BasicDetails);
        assert_eq!(c.store().draft(), &formulary_core::formula::Formula::default());
        assert!(!storage.is_populated());
    }

    #[tokio::test]
    async fn rapid_edits_trigger_one_compatibility_call() {
        let (mut c, _, api) = controller_with(FakeApi::default());
        c.initialize().await;
        c.store_mut().add_ingredient_by_id("water", Some(90.0));
        c.store_mut().add_ingredient_by_id("niacinamide", Some(5.0));
        c.store_mut().add_ingredient_by_id("ascorbic-acid", Some(5.0));

        assert!(c.await_compatibility(WAIT).await);
        assert_eq!(api.compatibility_calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.store().compatibility_issues().len(), 1);
        assert!(!c.store().status().is_loading(Operation::CompatibilityChecking));
    }

    #[tokio::test]
    async fn removing_clashing_ingredient_clears_issue() {
        let (mut c, _, _) = controller_with(FakeApi::default());
        c.initialize().await;
        c.store_mut().add_ingredient_by_id("niacinamide", Some(5.0));
        c.store_mut().add_ingredient_by_id("ascorbic-acid", Some(5.0));
        assert!(c.await_compatibility(WAIT).await);
        assert_eq!(c.store().compatibility_issues().len(), 1);

        c.store_mut().remove_ingredient("ascorbic-acid");
        assert!(c.await_compatibility(WAIT).await);
        assert!(c.store().compatibility_issues().is_empty());
    }

    #[tokio::test]
    async fn drain_applies_only_latest() {
        let (mut c, _, _) = controller_with(FakeApi::default());
        c.initialize().await;
        c.store_mut().add_ingredient_by_id("water", Some(50.0));
        assert!(c.await_compatibility(WAIT).await);
        assert_eq!(c.drain_compatibility(), 0);
    }

    #[test]
    fn compatibility_without_runtime_settles_with_error() {
        let (mut c, _, api) = controller_with(FakeApi::default());
        let water = catalog().remove(1);
        assert!(c.store_mut().add_ingredient(&water, Some(100.0)));

        assert_eq!(c.drain_compatibility(), 1);
        assert!(!c.store().compatibility_pending());
        let status = c.store().status();
        assert!(!status.is_loading(Operation::CompatibilityChecking));
        assert_eq!(status.error(Operation::CompatibilityChecking), Some("no async runtime"));
        assert_eq!(api.compatibility_calls.load(Ordering::SeqCst), 0);
    }
}
