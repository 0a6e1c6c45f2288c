//! Reference catalog of selectable ingredients.
//!
//! Catalog entries are fetched once per session and treated as immutable.
//! Formula lines only reference them by id (plus a cached display copy).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::percent::{MAX_PERCENTAGE, MIN_PERCENTAGE};

/// A selectable ingredient as described by the backend catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogIngredient {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub inci_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_max_percentage: Option<f64>,

    #[serde(default)]
    pub is_premium: bool,
}

impl CatalogIngredient {
    /// Creates an entry with only an id and display name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            inci_name: String::new(),
            phase: None,
            function: None,
            recommended_max_percentage: None,
            is_premium: false,
        }
    }

    pub fn with_inci(mut self, inci: impl Into<String>) -> Self {
        self.inci_name = inci.into();
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.recommended_max_percentage = Some(max);
        self
    }

    pub fn premium(mut self) -> Self {
        self.is_premium = true;
        self
    }

    /// Name to show in lists: the display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Formulation role inferred from a catalog entry, used to pick defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngredientRole {
    /// Water-like base added "q.s." to fill the formula up to 100%.
    QuantumSatis,
    Preservative,
    Active,
    Emulsifier,
    Other,
}

impl IngredientRole {
    /// Classifies an entry. Checks run in a fixed order; the first match wins.
    pub fn classify(entry: &CatalogIngredient) -> Self {
        let function = entry
            .function
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase();

        if is_water(entry) || function.contains("solvent") || function.contains("diluent") {
            Self::QuantumSatis
        } else if function.contains("preserv") {
            Self::Preservative
        } else if function.contains("active") {
            Self::Active
        } else if function.contains("emulsif") {
            Self::Emulsifier
        } else {
            Self::Other
        }
    }
}

fn is_water(entry: &CatalogIngredient) -> bool {
    [&entry.id, &entry.name, &entry.inci_name]
        .iter()
        .map(|s| s.trim().to_ascii_lowercase())
        .any(|s| {
            s == "water"
                || s == "aqua"
                || s == "aqua (water)"
                || s == "water (aqua)"
                || s == "deionized water"
                || s == "distilled water"
        })
}

/// Coerces a fetched catalog into a well-formed one.
///
/// Entries with an empty id are dropped, later duplicates of an id are
/// dropped, and out-of-range recommended maxima are clamped to `[0, 100]`
/// (NaN maxima are discarded). Returns the cleaned list and the number of
/// entries removed.
pub fn sanitize_catalog(entries: Vec<CatalogIngredient>) -> (Vec<CatalogIngredient>, usize) {
    let before = entries.len();
    let mut seen = HashSet::new();
    let cleaned: Vec<CatalogIngredient> = entries
        .into_iter()
        .filter(|e| !e.id.trim().is_empty())
        .filter(|e| seen.insert(e.id.clone()))
        .map(|mut e| {
            e.recommended_max_percentage = e
                .recommended_max_percentage
                .filter(|m| !m.is_nan())
                .map(|m| m.clamp(MIN_PERCENTAGE, MAX_PERCENTAGE));
            e
        })
        .collect();
    let removed = before - cleaned.len();
    (cleaned, removed)
}

/// Looks up an entry by id.
pub fn find<'a>(catalog: &'a [CatalogIngredient], id: &str) -> Option<&'a CatalogIngredient> {
    catalog.iter().find(|e| e.id == id)
}

/// Filter for the ingredient picker.
///
/// Empty / `None` criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    /// Case-insensitive substring over id, name and INCI name.
    pub text: String,
    /// Exact (case-insensitive) phase.
    pub phase: Option<String>,
    /// Exact (case-insensitive) function.
    pub function: Option<String>,
    /// Hide premium-only ingredients.
    pub exclude_premium: bool,
    /// Ids to hide, typically those already in the draft.
    pub exclude_ids: HashSet<String>,
}

impl CatalogQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Returns `true` if the entry passes every criterion.
    pub fn matches(&self, entry: &CatalogIngredient) -> bool {
        if self.exclude_premium && entry.is_premium {
            return false;
        }
        if self.exclude_ids.contains(&entry.id) {
            return false;
        }
        if let Some(ref phase) = self.phase {
            if !eq_ignore_case(entry.phase.as_deref(), phase) {
                return false;
            }
        }
        if let Some(ref function) = self.function {
            if !eq_ignore_case(entry.function.as_deref(), function) {
                return false;
            }
        }
        let needle = self.text.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&entry.id, &entry.name, &entry.inci_name]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    /// Applies the query, preserving catalog order.
    pub fn apply<'a>(&self, catalog: &'a [CatalogIngredient]) -> Vec<&'a CatalogIngredient> {
        catalog.iter().filter(|e| self.matches(e)).collect()
    }
}

fn eq_ignore_case(value: Option<&str>, expected: &str) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case(expected.trim()))
}
