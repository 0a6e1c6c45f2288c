//! Enum types for the formulary system.
//!
//! [`ProductType`] follows the string-backed pattern (custom Serialize /
//! Deserialize, `as_str()`, catch-all `Custom(String)`), so drafts carrying an
//! unknown category still load and are rejected later by validation instead of
//! at parse time. The wizard and operation enums are closed sets.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ===========================================================================
// ProductType
// ===========================================================================

/// Product category of a formula.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ProductType {
    /// Empty / unset.
    #[default]
    None,
    Serum,
    Cream,
    Lotion,
    Cleanser,
    Toner,
    Mask,
    Oil,
    Balm,
    Gel,
    Mist,
    Shampoo,
    Conditioner,
    Soap,
    Sunscreen,
    Custom(String),
}

impl ProductType {
    /// Returns the string representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "",
            Self::Serum => "serum",
            Self::Cream => "cream",
            Self::Lotion => "lotion",
            Self::Cleanser => "cleanser",
            Self::Toner => "toner",
            Self::Mask => "mask",
            Self::Oil => "oil",
            Self::Balm => "balm",
            Self::Gel => "gel",
            Self::Mist => "mist",
            Self::Shampoo => "shampoo",
            Self::Conditioner => "conditioner",
            Self::Soap => "soap",
            Self::Sunscreen => "sunscreen",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProductType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProductType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

impl From<&str> for ProductType {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Self::None,
            "serum" => Self::Serum,
            "cream" => Self::Cream,
            "lotion" => Self::Lotion,
            "cleanser" => Self::Cleanser,
            "toner" => Self::Toner,
            "mask" => Self::Mask,
            "oil" => Self::Oil,
            "balm" => Self::Balm,
            "gel" => Self::Gel,
            "mist" => Self::Mist,
            "shampoo" => Self::Shampoo,
            "conditioner" => Self::Conditioner,
            "soap" => Self::Soap,
            "sunscreen" => Self::Sunscreen,
            _ => Self::Custom(s.trim().to_owned()),
        }
    }
}

impl From<String> for ProductType {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

// ===========================================================================
// WizardStep
// ===========================================================================

/// Linear steps of the formula wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum WizardStep {
    #[default]
    BasicDetails,
    AiRecommendation,
    Ingredients,
    ManufacturingSteps,
    Review,
}

impl WizardStep {
    /// All steps in order.
    pub const ALL: [WizardStep; 5] = [
        Self::BasicDetails,
        Self::AiRecommendation,
        Self::Ingredients,
        Self::ManufacturingSteps,
        Self::Review,
    ];

    /// Number of steps in the wizard.
    pub const COUNT: usize = Self::ALL.len();

    /// Zero-based index of this step.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Step for a zero-based index, or `None` when out of range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The following step, or `None` on the terminal step.
    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// The preceding step, saturating at the first one.
    pub fn previous(self) -> Self {
        self.index()
            .checked_sub(1)
            .and_then(Self::from_index)
            .unwrap_or(Self::BasicDetails)
    }

    /// `true` for the Review & Save step.
    pub fn is_terminal(self) -> bool {
        self == Self::Review
    }

    /// Human-readable title.
    pub fn title(self) -> &'static str {
        match self {
            Self::BasicDetails => "Basic Details",
            Self::AiRecommendation => "AI Recommendation",
            Self::Ingredients => "Ingredients",
            Self::ManufacturingSteps => "Manufacturing Steps",
            Self::Review => "Review & Save",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.index(), self.title())
    }
}

impl Serialize for WizardStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.index() as u64)
    }
}

impl<'de> Deserialize<'de> for WizardStep {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let index = u64::deserialize(deserializer)?;
        Self::from_index(index as usize).ok_or_else(|| {
            serde::de::Error::custom(format!("wizard step {index} out of range"))
        })
    }
}

// ===========================================================================
// Operation
// ===========================================================================

/// Named asynchronous operations whose status is tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    IngredientsFetching,
    PhasesFetching,
    FunctionsFetching,
    CompatibilityChecking,
    FormulaGeneration,
    FormulaSaving,
}

impl Operation {
    /// All tracked operations.
    pub const ALL: [Operation; 6] = [
        Self::IngredientsFetching,
        Self::PhasesFetching,
        Self::FunctionsFetching,
        Self::CompatibilityChecking,
        Self::FormulaGeneration,
        Self::FormulaSaving,
    ];

    /// Returns the string key used in error maps.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IngredientsFetching => "ingredientsFetching",
            Self::PhasesFetching => "phasesFetching",
            Self::FunctionsFetching => "functionsFetching",
            Self::CompatibilityChecking => "compatibilityChecking",
            Self::FormulaGeneration => "formulaGeneration",
            Self::FormulaSaving => "formulaSaving",
        }
    }

    /// Parses a string key back into an operation.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == s)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
