//! Formula draft -- the entity the wizard composes.
//!
//! A draft owns an ordered list of [`IngredientLine`]s and an ordered list of
//! [`ManufacturingStep`]s. Both lists carry a 1-based `order` that must be
//! exactly `1..N`; ingredient ids must be unique. The store keeps these
//! invariants after every command; [`Formula::normalize`] restores them for
//! drafts that arrive from outside (recovered storage, generated formulas).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogIngredient;
use crate::enums::ProductType;
use crate::percent::{self, PercentageStatus};

/// Default batch weight in grams.
pub const DEFAULT_TOTAL_WEIGHT: f64 = 100.0;

fn default_total_weight() -> f64 {
    DEFAULT_TOTAL_WEIGHT
}

/// The in-progress formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Formula {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, rename = "type")]
    pub product_type: ProductType,

    #[serde(default)]
    pub is_public: bool,

    /// Batch weight in grams.
    #[serde(default = "default_total_weight")]
    pub total_weight: f64,

    #[serde(default)]
    pub ingredients: Vec<IngredientLine>,

    #[serde(default)]
    pub steps: Vec<ManufacturingStep>,
}

impl Default for Formula {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            product_type: ProductType::None,
            is_public: false,
            total_weight: DEFAULT_TOTAL_WEIGHT,
            ingredients: Vec::new(),
            steps: Vec::new(),
        }
    }
}

/// One ingredient in the formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientLine {
    pub ingredient_id: String,

    pub percentage: f64,

    /// 1-based position.
    #[serde(default)]
    pub order: u32,

    /// Display copy of the catalog entry, kept for offline rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredient: Option<CatalogIngredient>,
}

impl IngredientLine {
    pub fn new(ingredient_id: impl Into<String>, percentage: f64) -> Self {
        Self {
            ingredient_id: ingredient_id.into(),
            percentage,
            order: 0,
            ingredient: None,
        }
    }

    /// Line for a catalog entry, caching the entry for display.
    pub fn from_catalog(entry: &CatalogIngredient, percentage: f64) -> Self {
        Self {
            ingredient_id: entry.id.clone(),
            percentage,
            order: 0,
            ingredient: Some(entry.clone()),
        }
    }

    /// Cached display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.ingredient
            .as_ref()
            .map(CatalogIngredient::display_name)
            .unwrap_or(self.ingredient_id.as_str())
    }

    /// Cached phase, if known.
    pub fn phase(&self) -> Option<&str> {
        self.ingredient.as_ref().and_then(|i| i.phase.as_deref())
    }
}

/// One manufacturing instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManufacturingStep {
    pub description: String,

    /// 1-based position; also the step's identity.
    #[serde(default)]
    pub order: u32,
}

impl ManufacturingStep {
    pub fn new(description: impl Into<String>, order: u32) -> Self {
        Self {
            description: description.into(),
            order,
        }
    }
}

/// A flagged interaction risk between two ingredients, computed externally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityIssue {
    pub first: String,
    pub second: String,
    pub description: String,
}

/// Grams of one line for the current batch weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchQuantity {
    pub ingredient_id: String,
    pub percentage: f64,
    pub grams: f64,
}

/// What [`Formula::normalize`] had to repair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub duplicate_ingredients: usize,
    pub clamped_percentages: usize,
    pub empty_steps: usize,
    pub renumbered: bool,
}

impl NormalizeReport {
    /// `true` if nothing had to change.
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

impl Formula {
    /// Sum of all line percentages.
    pub fn total_percentage(&self) -> f64 {
        self.ingredients.iter().map(|l| l.percentage).sum()
    }

    /// Percentage left before reaching 100, never negative.
    pub fn remaining_percentage(&self) -> f64 {
        percent::round1(percent::remaining_room(self.total_percentage()))
    }

    pub fn percentage_status(&self) -> PercentageStatus {
        PercentageStatus::of_total(self.total_percentage())
    }

    pub fn contains_ingredient(&self, ingredient_id: &str) -> bool {
        self.ingredients.iter().any(|l| l.ingredient_id == ingredient_id)
    }

    pub fn line(&self, ingredient_id: &str) -> Option<&IngredientLine> {
        self.ingredients.iter().find(|l| l.ingredient_id == ingredient_id)
    }

    pub fn step(&self, order: u32) -> Option<&ManufacturingStep> {
        self.steps.iter().find(|s| s.order == order)
    }

    /// Ingredient ids in line order.
    pub fn ingredient_ids(&self) -> Vec<String> {
        self.ingredients.iter().map(|l| l.ingredient_id.clone()).collect()
    }

    /// Grams per line for [`Formula::total_weight`], rounded to 0.01 g.
    pub fn batch_quantities(&self) -> Vec<BatchQuantity> {
        self.ingredients
            .iter()
            .map(|l| BatchQuantity {
                ingredient_id: l.ingredient_id.clone(),
                percentage: l.percentage,
                grams: ((l.percentage * self.total_weight / 100.0) * 100.0).round() / 100.0,
            })
            .collect()
    }

    /// Lines grouped by cached phase, in order of first appearance.
    ///
    /// Lines without a known phase are grouped under `None`.
    pub fn lines_by_phase(&self) -> Vec<(Option<&str>, Vec<&IngredientLine>)> {
        let mut groups: Vec<(Option<&str>, Vec<&IngredientLine>)> = Vec::new();
        for line in &self.ingredients {
            let phase = line.phase();
            match groups.iter_mut().find(|(p, _)| *p == phase) {
                Some((_, lines)) => lines.push(line),
                None => groups.push((phase, vec![line])),
            }
        }
        groups
    }

    /// Renumbers ingredient lines to `1..N` in their current order.
    pub fn renumber_ingredients(&mut self) {
        for (i, line) in self.ingredients.iter_mut().enumerate() {
            line.order = i as u32 + 1;
        }
    }

    /// Renumbers steps to `1..N` in their current order.
    pub fn renumber_steps(&mut self) {
        for (i, step) in self.steps.iter_mut().enumerate() {
            step.order = i as u32 + 1;
        }
    }

    /// `true` if both `order` sequences are exactly `1..N` and ids are unique.
    pub fn is_consistent(&self) -> bool {
        let mut seen = HashSet::new();
        let unique = self
            .ingredients
            .iter()
            .all(|l| seen.insert(l.ingredient_id.as_str()));
        let lines_ok = self
            .ingredients
            .iter()
            .enumerate()
            .all(|(i, l)| l.order == i as u32 + 1);
        let steps_ok = self
            .steps
            .iter()
            .enumerate()
            .all(|(i, s)| s.order == i as u32 + 1);
        unique && lines_ok && steps_ok
    }

    /// Repairs a draft that did not come through the store's commands.
    ///
    /// Later duplicates of an ingredient id are dropped in list order (the
    /// first listed occurrence wins, whatever its stored `order`). The
    /// survivors are then sorted by `order` (stable, so ties keep list
    /// position), percentages are clamped and rounded, whitespace-only steps
    /// are dropped, and both lists are renumbered. A non-positive or
    /// non-finite total weight falls back to the default.
    pub fn normalize(&mut self) -> NormalizeReport {
        let mut report = NormalizeReport::default();

        let mut seen = HashSet::new();
        let before = self.ingredients.len();
        self.ingredients
            .retain(|l| !l.ingredient_id.is_empty() && seen.insert(l.ingredient_id.clone()));
        report.duplicate_ingredients = before - self.ingredients.len();
        self.ingredients.sort_by_key(|l| l.order);

        for line in &mut self.ingredients {
            let clamped = percent::clamp_percentage(line.percentage);
            if clamped != line.percentage {
                report.clamped_percentages += 1;
                line.percentage = clamped;
            }
        }

        self.steps.sort_by_key(|s| s.order);
        let before = self.steps.len();
        self.steps.retain(|s| !s.description.trim().is_empty());
        report.empty_steps = before - self.steps.len();

        if !self.total_weight.is_finite() || self.total_weight <= 0.0 {
            self.total_weight = DEFAULT_TOTAL_WEIGHT;
        }

        if !self.is_consistent() {
            report.renumbered = true;
            self.renumber_ingredients();
            self.renumber_steps();
        }

        report
    }
}

/// A formula produced by the AI collaborator.
///
/// Same shape as [`Formula`], but every field is optional: only the fields
/// the generator filled in are merged into the draft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFormula {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub product_type: Option<ProductType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_weight: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<IngredientLine>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<ManufacturingStep>>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`Formula`] values (fixtures, generated templates, tests).
///
/// Percentages are stored as given; call [`Formula::normalize`] if the input
/// is untrusted.
#[derive(Debug, Clone, Default)]
pub struct FormulaBuilder {
    formula: Formula,
}

impl FormulaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let mut formula = Formula::default();
        formula.name = name.into();
        Self { formula }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.formula.description = description.into();
        self
    }

    pub fn product_type(mut self, product_type: impl Into<ProductType>) -> Self {
        self.formula.product_type = product_type.into();
        self
    }

    pub fn public(mut self, is_public: bool) -> Self {
        self.formula.is_public = is_public;
        self
    }

    pub fn total_weight(mut self, grams: f64) -> Self {
        self.formula.total_weight = grams;
        self
    }

    /// Appends a line with the next order number.
    pub fn line(mut self, ingredient_id: impl Into<String>, percentage: f64) -> Self {
        let mut line = IngredientLine::new(ingredient_id, percentage);
        line.order = self.formula.ingredients.len() as u32 + 1;
        self.formula.ingredients.push(line);
        self
    }

    /// Appends a step with the next order number.
    pub fn step(mut self, description: impl Into<String>) -> Self {
        let order = self.formula.steps.len() as u32 + 1;
        self.formula.steps.push(ManufacturingStep::new(description, order));
        self
    }

    pub fn build(self) -> Formula {
        self.formula
    }
}
