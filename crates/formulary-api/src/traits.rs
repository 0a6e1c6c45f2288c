//! The collaborator interface consumed by the wizard.

use async_trait::async_trait;

use formulary_core::catalog::CatalogIngredient;
use formulary_core::formula::{CompatibilityIssue, GeneratedFormula};
use formulary_core::payload::{GenerationRequest, SaveFormulaRequest, SavedFormula};

use crate::error::Result;

/// Remote operations the formula wizard depends on.
///
/// Signatures are logical; the transport (HTTP, fixtures, fakes) is the
/// implementor's concern. Every call may fail independently.
#[async_trait]
pub trait FormulaApi: Send + Sync {
    /// Full ingredient catalog for the session.
    async fn fetch_catalog(&self) -> Result<Vec<CatalogIngredient>>;

    /// Formulation phase names ("Water Phase", "Cool Down", ...).
    async fn fetch_phases(&self) -> Result<Vec<String>>;

    /// Ingredient function names ("Humectant", "Preservative", ...).
    async fn fetch_functions(&self) -> Result<Vec<String>>;

    /// Interaction risks among the given ingredient ids.
    async fn check_compatibility(&self, ingredient_ids: &[String])
    -> Result<Vec<CompatibilityIssue>>;

    /// Asks the generator for a formula matching the request.
    async fn generate_formula(&self, request: &GenerationRequest) -> Result<GeneratedFormula>;

    /// Persists a formula and returns the stored record.
    async fn save_formula(&self, request: &SaveFormulaRequest) -> Result<SavedFormula>;
}
