//! Payloads exchanged with the backend collaborators.
//!
//! The save payload strips everything display-only from the draft: lines keep
//! `ingredientId`, `percentage` and `order`; steps keep `description` and
//! `order`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::ProductType;
use crate::formula::{Formula, IngredientLine, ManufacturingStep};

/// Ingredient line as sent to the save endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveIngredient {
    pub ingredient_id: String,
    pub percentage: f64,
    pub order: u32,
}

impl From<&IngredientLine> for SaveIngredient {
    fn from(line: &IngredientLine) -> Self {
        Self {
            ingredient_id: line.ingredient_id.clone(),
            percentage: line.percentage,
            order: line.order,
        }
    }
}

/// Manufacturing step as sent to the save endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStep {
    pub description: String,
    pub order: u32,
}

impl From<&ManufacturingStep> for SaveStep {
    fn from(step: &ManufacturingStep) -> Self {
        Self {
            description: step.description.clone(),
            order: step.order,
        }
    }
}

/// Body of a save request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFormulaRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    #[serde(default)]
    pub is_public: bool,
    pub total_weight: f64,
    pub ingredients: Vec<SaveIngredient>,
    pub steps: Vec<SaveStep>,
}

impl SaveFormulaRequest {
    /// Builds the request from a draft, dropping cached display data.
    pub fn from_draft(draft: &Formula) -> Self {
        Self {
            name: draft.name.trim().to_string(),
            description: draft.description.clone(),
            product_type: draft.product_type.clone(),
            is_public: draft.is_public,
            total_weight: draft.total_weight,
            ingredients: draft.ingredients.iter().map(SaveIngredient::from).collect(),
            steps: draft.steps.iter().map(SaveStep::from).collect(),
        }
    }
}

/// A formula as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFormula {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub formula: SaveFormulaRequest,
}

/// Where the generator should take skin concerns from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "concerns", rename_all = "camelCase")]
pub enum SkinConcerns {
    /// Concerns given explicitly by the user.
    Explicit(Vec<String>),
    /// Derive concerns from the stored user profile.
    FromProfile,
}

impl Default for SkinConcerns {
    fn default() -> Self {
        Self::Explicit(Vec::new())
    }
}

/// Request for an AI-generated formula.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[serde(rename = "type")]
    pub product_type: ProductType,

    #[serde(default)]
    pub preferred_ingredients: Vec<String>,

    #[serde(default)]
    pub avoided_ingredients: Vec<String>,

    #[serde(default)]
    pub skin_concerns: SkinConcerns,
}

impl GenerationRequest {
    pub fn new(product_type: impl Into<ProductType>) -> Self {
        Self {
            product_type: product_type.into(),
            ..Self::default()
        }
    }

    pub fn prefer(mut self, ingredient_id: impl Into<String>) -> Self {
        self.preferred_ingredients.push(ingredient_id.into());
        self
    }

    pub fn avoid(mut self, ingredient_id: impl Into<String>) -> Self {
        self.avoided_ingredients.push(ingredient_id.into());
        self
    }

    pub fn concerns(mut self, concerns: SkinConcerns) -> Self {
        self.skin_concerns = concerns;
        self
    }
}
