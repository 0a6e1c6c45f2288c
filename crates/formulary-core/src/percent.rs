//! Percentage arithmetic for ingredient lines.
//!
//! Every stored percentage lies in `[0, 100]` and is rounded to one decimal
//! place. The "sums to 100" rule is soft: it uses a ±0.1 tolerance and only
//! blocks the wizard, never a save.

use crate::catalog::{CatalogIngredient, IngredientRole};

/// Lowest percentage a line may hold.
pub const MIN_PERCENTAGE: f64 = 0.0;

/// Highest percentage a line may hold.
pub const MAX_PERCENTAGE: f64 = 100.0;

/// The total a balanced formula sums to.
pub const TARGET_TOTAL: f64 = 100.0;

/// Allowed deviation of the total from [`TARGET_TOTAL`].
pub const TOTAL_TOLERANCE: f64 = 0.1;

/// Float slack so that e.g. `100.1 - 100.0` still counts as within tolerance.
const EPSILON: f64 = 1e-9;

/// Default for ingredients with no recognised role.
pub const DEFAULT_PERCENTAGE: f64 = 5.0;
pub const PRESERVATIVE_PERCENTAGE: f64 = 0.5;
pub const ACTIVE_PERCENTAGE: f64 = 2.0;
pub const EMULSIFIER_PERCENTAGE: f64 = 3.0;

/// Rounds to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Clamps to `[0, 100]` and rounds to one decimal. NaN becomes `0`.
pub fn clamp_percentage(value: f64) -> f64 {
    if value.is_nan() {
        return MIN_PERCENTAGE;
    }
    round1(value.clamp(MIN_PERCENTAGE, MAX_PERCENTAGE))
}

/// Parses user input into a stored percentage.
///
/// Surrounding whitespace and a trailing `%` are ignored. Anything that does
/// not parse as a number yields `0`; the result is clamped and rounded.
pub fn parse_percentage(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
    match trimmed.parse::<f64>() {
        Ok(value) => clamp_percentage(value),
        Err(_) => MIN_PERCENTAGE,
    }
}

/// Room left before the total reaches 100, never negative.
pub fn remaining_room(current_total: f64) -> f64 {
    (TARGET_TOTAL - current_total).max(0.0)
}

/// Computes the initial percentage for a newly added ingredient.
///
/// Precedence is fixed: role default (quantum-satis ingredients take the
/// remaining room) → catalog recommended maximum → remaining room → round.
pub fn default_percentage(entry: &CatalogIngredient, current_total: f64) -> f64 {
    let remaining = remaining_room(current_total);

    let mut pct = match IngredientRole::classify(entry) {
        IngredientRole::QuantumSatis => remaining,
        IngredientRole::Preservative => PRESERVATIVE_PERCENTAGE,
        IngredientRole::Active => ACTIVE_PERCENTAGE,
        IngredientRole::Emulsifier => EMULSIFIER_PERCENTAGE,
        IngredientRole::Other => DEFAULT_PERCENTAGE,
    };

    if let Some(max) = entry.recommended_max_percentage {
        if max < pct {
            pct = max;
        }
    }

    pct = pct.min(remaining);
    clamp_percentage(pct)
}

/// Where a formula's total sits relative to 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PercentageStatus {
    /// Below `100 - tolerance`.
    Under,
    /// Within tolerance of 100.
    Balanced,
    /// Above `100 + tolerance`.
    Over,
}

impl PercentageStatus {
    /// Classifies a total.
    pub fn of_total(total: f64) -> Self {
        if is_balanced(total) {
            Self::Balanced
        } else if total < TARGET_TOTAL {
            Self::Under
        } else {
            Self::Over
        }
    }

    pub fn is_balanced(self) -> bool {
        self == Self::Balanced
    }
}

/// `true` when `|total - 100| <= 0.1`.
pub fn is_balanced(total: f64) -> bool {
    (total - TARGET_TOTAL).abs() <= TOTAL_TOLERANCE + EPSILON
}
