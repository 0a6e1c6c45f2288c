//! Fixture-backed [`FormulaApi`]: catalog, rules and templates from a file.
//!
//! A fixture file (TOML or JSON, chosen by extension) declares the catalog,
//! phase and function lists, incompatible ingredient pairs and one formula
//! template per product type:
//!
//! ```toml
//! phases = ["Water Phase", "Cool Down"]
//! functions = ["Solvent", "Active"]
//!
//! [[ingredients]]
//! id = "water"
//! name = "Water"
//! inciName = "Aqua"
//! phase = "Water Phase"
//! function = "Solvent"
//!
//! [[incompatible]]
//! first = "niacinamide"
//! second = "ascorbic-acid"
//! description = "Low pH may reduce niacinamide efficacy"
//!
//! [[templates]]
//! type = "serum"
//! name = "Hydrating Serum"
//! steps = ["Combine water phase", "Add actives below 40C"]
//! ingredients = [{ id = "water", percentage = 95.0 }, { id = "niacinamide", percentage = 5.0 }]
//! ```
//!
//! Saved formulas are written as pretty JSON into the configured output
//! directory, one file per save.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use formulary_core::catalog::{self, CatalogIngredient, IngredientRole};
use formulary_core::enums::ProductType;
use formulary_core::formula::{
    CompatibilityIssue, GeneratedFormula, IngredientLine, ManufacturingStep,
};
use formulary_core::payload::{GenerationRequest, SaveFormulaRequest, SavedFormula, SkinConcerns};
use formulary_core::percent;

use crate::error::{ApiError, Result};
use crate::traits::FormulaApi;

/// A pair of ingredients that should not be combined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompatiblePair {
    pub first: String,
    pub second: String,
    #[serde(default)]
    pub description: String,
}

impl IncompatiblePair {
    fn involves_both(&self, ids: &[String]) -> bool {
        ids.contains(&self.first) && ids.contains(&self.second)
    }
}

/// One ingredient line of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateLine {
    pub id: String,
    pub percentage: f64,
}

/// Starting formula the fixture generator returns for a product type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(rename = "type")]
    pub product_type: ProductType,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub ingredients: Vec<TemplateLine>,

    #[serde(default)]
    pub steps: Vec<String>,
}

/// Root structure of a fixture file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureCatalog {
    #[serde(default)]
    pub ingredients: Vec<CatalogIngredient>,

    #[serde(default)]
    pub phases: Vec<String>,

    #[serde(default)]
    pub functions: Vec<String>,

    #[serde(default)]
    pub incompatible: Vec<IncompatiblePair>,

    #[serde(default)]
    pub templates: Vec<Template>,

    /// Skin concerns used when a generation request defers to the profile.
    #[serde(default)]
    pub profile_concerns: Vec<String>,
}

impl FixtureCatalog {
    /// Parse a fixture from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Parse a fixture from a JSON string.
    pub fn parse_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a fixture file (auto-detect TOML vs JSON by extension).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                ApiError::not_found(format!("catalog file {}", path.display()))
            }
            _ => ApiError::Io(e),
        })?;
        let fixture = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::parse_toml(&content)?,
            Some("json") => Self::parse_json(&content)?,
            // Try JSON first, then TOML
            _ => Self::parse_json(&content).or_else(|_| Self::parse_toml(&content))?,
        };
        debug!(?path, ingredients = fixture.ingredients.len(), "loaded fixture catalog");
        Ok(fixture.sanitized())
    }

    /// Coerces malformed entries instead of trusting them downstream.
    ///
    /// Bad catalog entries go through [`catalog::sanitize_catalog`]; template
    /// lines naming unknown ingredients are dropped.
    pub fn sanitized(mut self) -> Self {
        let (ingredients, removed) = catalog::sanitize_catalog(self.ingredients);
        if removed > 0 {
            warn!(removed, "dropped malformed fixture ingredients");
        }
        self.ingredients = ingredients;

        for template in &mut self.templates {
            let before = template.ingredients.len();
            let known = &self.ingredients;
            template
                .ingredients
                .retain(|l| catalog::find(known, &l.id).is_some());
            if template.ingredients.len() != before {
                warn!(
                    product_type = %template.product_type,
                    dropped = before - template.ingredients.len(),
                    "template references unknown ingredients"
                );
            }
        }
        self
    }

    pub fn template(&self, product_type: &ProductType) -> Option<&Template> {
        self.templates.iter().find(|t| &t.product_type == product_type)
    }
}

/// [`FormulaApi`] backed by a [`FixtureCatalog`].
#[derive(Debug, Clone)]
pub struct FixtureApi {
    fixture: FixtureCatalog,
    output_dir: Option<PathBuf>,
}

impl FixtureApi {
    pub fn new(fixture: FixtureCatalog) -> Self {
        Self {
            fixture,
            output_dir: None,
        }
    }

    /// Loads the fixture file at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(FixtureCatalog::load(path)?))
    }

    /// Enables saving into `dir` (created on first save).
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn fixture(&self) -> &FixtureCatalog {
        &self.fixture
    }

    fn build_generated(&self, request: &GenerationRequest) -> Result<GeneratedFormula> {
        let template = self
            .fixture
            .template(&request.product_type)
            .ok_or_else(|| {
                ApiError::not_found(format!(
                    "no template for product type '{}'",
                    request.product_type
                ))
            })?;

        let mut lines: Vec<IngredientLine> = template
            .ingredients
            .iter()
            .filter(|l| !request.avoided_ingredients.contains(&l.id))
            .map(|l| self.line(&l.id, percent::clamp_percentage(l.percentage)))
            .collect();

        for id in &request.preferred_ingredients {
            if request.avoided_ingredients.contains(id)
                || lines.iter().any(|l| &l.ingredient_id == id)
            {
                continue;
            }
            match catalog::find(&self.fixture.ingredients, id) {
                Some(entry) => {
                    // The q.s. line is rebalanced below, so it does not use up room.
                    let total: f64 = lines
                        .iter()
                        .filter(|l| !is_quantum_satis(l))
                        .map(|l| l.percentage)
                        .sum();
                    let pct = percent::default_percentage(entry, total);
                    lines.push(IngredientLine::from_catalog(entry, pct));
                }
                None => debug!(ingredient = %id, "preferred ingredient not in catalog"),
            }
        }

        rebalance(&mut lines);
        for (i, line) in lines.iter_mut().enumerate() {
            line.order = i as u32 + 1;
        }

        let concerns = match &request.skin_concerns {
            SkinConcerns::Explicit(list) => list.clone(),
            SkinConcerns::FromProfile => self.fixture.profile_concerns.clone(),
        };
        let mut description = template.description.clone();
        if !concerns.is_empty() {
            if !description.is_empty() {
                description.push(' ');
            }
            description.push_str(&format!("Targets: {}.", concerns.join(", ")));
        }

        let steps = template
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| ManufacturingStep::new(s.clone(), i as u32 + 1))
            .collect();

        Ok(GeneratedFormula {
            name: (!template.name.is_empty()).then(|| template.name.clone()),
            description: Some(description),
            product_type: Some(template.product_type.clone()),
            ingredients: Some(lines),
            steps: Some(steps),
            ..GeneratedFormula::default()
        })
    }

    fn line(&self, id: &str, percentage: f64) -> IngredientLine {
        match catalog::find(&self.fixture.ingredients, id) {
            Some(entry) => IngredientLine::from_catalog(entry, percentage),
            None => IngredientLine::new(id, percentage),
        }
    }
}

fn is_quantum_satis(line: &IngredientLine) -> bool {
    line.ingredient
        .as_ref()
        .is_some_and(|e| IngredientRole::classify(e) == IngredientRole::QuantumSatis)
}

/// Lets the first quantum-satis line absorb whatever keeps the total off 100.
fn rebalance(lines: &mut [IngredientLine]) {
    let Some(qs) = lines.iter().position(is_quantum_satis) else {
        return;
    };
    let others: f64 = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != qs)
        .map(|(_, l)| l.percentage)
        .sum();
    lines[qs].percentage = percent::clamp_percentage(percent::remaining_room(others));
}

fn slug(name: &str) -> String {
    let slug: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() { "formula".to_string() } else { slug }
}

#[async_trait]
impl FormulaApi for FixtureApi {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogIngredient>> {
        Ok(self.fixture.ingredients.clone())
    }

    async fn fetch_phases(&self) -> Result<Vec<String>> {
        Ok(self.fixture.phases.clone())
    }

    async fn fetch_functions(&self) -> Result<Vec<String>> {
        Ok(self.fixture.functions.clone())
    }

    async fn check_compatibility(
        &self,
        ingredient_ids: &[String],
    ) -> Result<Vec<CompatibilityIssue>> {
        let issues: Vec<CompatibilityIssue> = self
            .fixture
            .incompatible
            .iter()
            .filter(|pair| pair.involves_both(ingredient_ids))
            .map(|pair| CompatibilityIssue {
                first: pair.first.clone(),
                second: pair.second.clone(),
                description: pair.description.clone(),
            })
            .collect();
        debug!(ingredients = ingredient_ids.len(), issues = issues.len(), "compatibility checked");
        Ok(issues)
    }

    async fn generate_formula(&self, request: &GenerationRequest) -> Result<GeneratedFormula> {
        let generated = self.build_generated(request)?;
        info!(product_type = %request.product_type, "generated formula from template");
        Ok(generated)
    }

    async fn save_formula(&self, request: &SaveFormulaRequest) -> Result<SavedFormula> {
        if request.name.trim().is_empty() {
            return Err(ApiError::rejected("Formula name is required"));
        }
        let dir = self
            .output_dir
            .as_ref()
            .ok_or_else(|| ApiError::unavailable("no save output directory configured"))?;

        let created_at = Utc::now();
        let id = format!(
            "{}-{}",
            slug(&request.name),
            created_at.format("%Y%m%d%H%M%S%3f")
        );
        let saved = SavedFormula {
            id,
            created_at: Some(created_at),
            formula: request.clone(),
        };

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.json", saved.id));
        let json = serde_json::to_string_pretty(&saved)?;
        tokio::fs::write(&path, json).await?;
        info!(id = %saved.id, ?path, "saved formula");
        Ok(saved)
    }
}
