//! Step-exit validation rules for the formula wizard.
//!
//! Validation never fails hard: each rule contributes an entry to a
//! [`ValidationErrors`] map keyed by the offending field, and the wizard
//! refuses to advance while the map is non-empty.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::enums::{ProductType, WizardStep};
use crate::formula::Formula;
use crate::percent::{self, TARGET_TOTAL, TOTAL_TOLERANCE};

/// Field a validation message is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValidationField {
    Name,
    Type,
    TotalWeight,
    Ingredients,
    TotalPercentage,
    Steps,
}

impl ValidationField {
    /// Returns the camelCase key used by UI consumers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Type => "type",
            Self::TotalWeight => "totalWeight",
            Self::Ingredients => "ingredients",
            Self::TotalPercentage => "totalPercentage",
            Self::Steps => "steps",
        }
    }
}

impl fmt::Display for ValidationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ValidationField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Per-field validation messages. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<ValidationField, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, field: ValidationField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn get(&self, field: ValidationField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn insert(&mut self, field: ValidationField, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Fields with errors, in a stable order.
    pub fn fields(&self) -> Vec<ValidationField> {
        self.0.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ValidationField, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Exit rule for Basic Details: name, a known product type, positive weight.
pub fn validate_basic_details(formula: &Formula) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if formula.name.trim().is_empty() {
        errors.insert(ValidationField::Name, "Formula name is required");
    }
    match formula.product_type {
        ProductType::None => {
            errors.insert(ValidationField::Type, "Product type is required");
        }
        ProductType::Custom(ref other) => {
            errors.insert(
                ValidationField::Type,
                format!("Unknown product type: {other}"),
            );
        }
        _ => {}
    }
    if !formula.total_weight.is_finite() || formula.total_weight <= 0.0 {
        errors.insert(
            ValidationField::TotalWeight,
            "Total weight must be greater than 0",
        );
    }
    errors
}

/// Exit rule for Ingredients: at least one line and a balanced total.
///
/// Both errors are reported together when both apply.
pub fn validate_ingredients(formula: &Formula) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if formula.ingredients.is_empty() {
        errors.insert(ValidationField::Ingredients, "Add at least one ingredient");
    }
    let total = formula.total_percentage();
    if !percent::is_balanced(total) {
        errors.insert(
            ValidationField::TotalPercentage,
            format!(
                "Total percentage must be {TARGET_TOTAL}% (±{TOTAL_TOLERANCE}), currently {:.1}%",
                total
            ),
        );
    }
    errors
}

/// Exit rule for Manufacturing Steps: at least one step.
pub fn validate_steps(formula: &Formula) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if formula.steps.is_empty() {
        errors.insert(ValidationField::Steps, "Add at least one manufacturing step");
    }
    errors
}

/// Exit rule for the given step. Steps without a rule always pass.
pub fn validate_step(step: WizardStep, formula: &Formula) -> ValidationErrors {
    match step {
        WizardStep::BasicDetails => validate_basic_details(formula),
        WizardStep::AiRecommendation => ValidationErrors::new(),
        WizardStep::Ingredients => validate_ingredients(formula),
        WizardStep::ManufacturingSteps => validate_steps(formula),
        WizardStep::Review => ValidationErrors::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::FormulaBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn basic_details_require_name_and_type() {
        let errors = validate_basic_details(&Formula::default());
        assert_eq!(
            errors.fields(),
            vec![ValidationField::Name, ValidationField::Type]
        );

        let ok = FormulaBuilder::new("Hydra Serum").product_type("serum").build();
        assert!(validate_basic_details(&ok).is_empty());
    }

    #[test]
    fn basic_details_reject_unknown_type_and_bad_weight() {
        let f = FormulaBuilder::new("X")
            .product_type("potion")
            .total_weight(0.0)
            .build();
        let errors = validate_basic_details(&f);
        assert_eq!(errors.get(ValidationField::Type), Some("Unknown product type: potion"));
        assert!(errors.contains(ValidationField::TotalWeight));
    }

    #[test]
    fn whitespace_name_is_empty() {
        let f = FormulaBuilder::new("   ").product_type("cream").build();
        assert!(validate_basic_details(&f).contains(ValidationField::Name));
    }

    #[test]
    fn empty_ingredients_report_both_keys() {
        let errors = validate_ingredients(&Formula::default());
        assert!(errors.contains(ValidationField::Ingredients));
        assert!(errors.contains(ValidationField::TotalPercentage));
    }

    #[test]
    fn under_total_fails() {
        let f = FormulaBuilder::new("x").line("a", 90.0).line("b", 4.9).build();
        let errors = validate_ingredients(&f);
        assert_eq!(errors.fields(), vec![ValidationField::TotalPercentage]);
    }

    #[test]
    fn total_within_tolerance_passes() {
        let f = FormulaBuilder::new("x").line("a", 50.0).line("b", 50.05).build();
        assert!(validate_ingredients(&f).is_empty());
    }

    #[test]
    fn steps_required() {
        assert!(validate_steps(&Formula::default()).contains(ValidationField::Steps));
        let f = FormulaBuilder::new("x").step("Mix").build();
        assert!(validate_steps(&f).is_empty());
    }

    #[test]
    fn optional_steps_always_pass() {
        let f = Formula::default();
        assert!(validate_step(WizardStep::AiRecommendation, &f).is_empty());
        assert!(validate_step(WizardStep::Review, &f).is_empty());
    }

    #[test]
    fn errors_serialize_as_keyed_map() {
        let mut errors = ValidationErrors::new();
        errors.insert(ValidationField::TotalPercentage, "off");
        let json = serde_json::to_string(&errors).unwrap();
        assert_eq!(json, r#"{"totalPercentage":"off"}"#);
    }
}
