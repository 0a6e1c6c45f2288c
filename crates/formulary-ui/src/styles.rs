//! Ayu color theme and render helpers for formulary CLI output.
//!
//! Uses the Ayu Dark color palette for consistent terminal styling.
//! Color source: <https://github.com/ayu-theme/ayu-colors>
//!
//! Only states that need attention get color: an unbalanced total, a
//! compatibility issue, a validation or operation error. Everything else is
//! standard text with muted decorations.

use formulary_core::catalog::CatalogIngredient;
use formulary_core::enums::{Operation, WizardStep};
use formulary_core::formula::{CompatibilityIssue, IngredientLine, ManufacturingStep};
use formulary_core::percent::{self, PercentageStatus};
use formulary_core::validation::ValidationField;
use owo_colors::OwoColorize;

use crate::terminal::supports_color;

// ---------------------------------------------------------------------------
// Ayu Dark color palette (RGB values)
// ---------------------------------------------------------------------------

const PASS: (u8, u8, u8) = (0xc2, 0xd9, 0x4c); // #c2d94c - bright green
const WARN: (u8, u8, u8) = (0xff, 0xb4, 0x54); // #ffb454 - bright yellow
const FAIL: (u8, u8, u8) = (0xf0, 0x71, 0x78); // #f07178 - bright red
const MUTED: (u8, u8, u8) = (0x6c, 0x76, 0x80); // #6c7680 - muted gray
const ACCENT: (u8, u8, u8) = (0x59, 0xc2, 0xff); // #59c2ff - bright blue
const PREMIUM: (u8, u8, u8) = (0xd2, 0xa6, 0xff); // #d2a6ff - purple

// General icons
pub const ICON_PASS: &str = "\u{2713}"; // ✓
pub const ICON_WARN: &str = "\u{26A0}"; // ⚠
pub const ICON_FAIL: &str = "\u{2716}"; // ✖
pub const ICON_INFO: &str = "\u{2139}"; // ℹ

// Step progress markers
pub const STEP_DONE: &str = "\u{25CF}"; // ●
pub const STEP_CURRENT: &str = "\u{25D0}"; // ◐
pub const STEP_TODO: &str = "\u{25CB}"; // ○

// ---------------------------------------------------------------------------
// Helper: apply truecolor only when color is supported
// ---------------------------------------------------------------------------

fn color_str(s: &str, rgb: (u8, u8, u8)) -> String {
    if supports_color() {
        s.truecolor(rgb.0, rgb.1, rgb.2).to_string()
    } else {
        s.to_string()
    }
}

fn color_bold_str(s: &str, rgb: (u8, u8, u8)) -> String {
    if supports_color() {
        s.truecolor(rgb.0, rgb.1, rgb.2).bold().to_string()
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Core semantic render helpers
// ---------------------------------------------------------------------------

pub fn render_pass(s: &str) -> String {
    color_str(s, PASS)
}

pub fn render_warn(s: &str) -> String {
    color_str(s, WARN)
}

pub fn render_fail(s: &str) -> String {
    color_str(s, FAIL)
}

pub fn render_muted(s: &str) -> String {
    color_str(s, MUTED)
}

pub fn render_accent(s: &str) -> String {
    color_str(s, ACCENT)
}

pub fn render_bold(s: &str) -> String {
    if supports_color() {
        s.bold().to_string()
    } else {
        s.to_string()
    }
}

/// Renders a section header in uppercase with accent color and bold.
pub fn render_category(s: &str) -> String {
    color_bold_str(&s.to_uppercase(), ACCENT)
}

// ---------------------------------------------------------------------------
// Wizard rendering
// ---------------------------------------------------------------------------

/// Renders the step header, e.g. `◐ 2. Ingredients  ●●◐○○`.
pub fn render_step_header(current: WizardStep) -> String {
    let progress: String = WizardStep::ALL
        .iter()
        .map(|step| {
            if *step < current {
                render_pass(STEP_DONE)
            } else if *step == current {
                render_accent(STEP_CURRENT)
            } else {
                render_muted(STEP_TODO)
            }
        })
        .collect();
    format!(
        "{} {}  {}",
        render_accent(STEP_CURRENT),
        color_bold_str(&current.to_string(), ACCENT),
        progress
    )
}

/// Renders a formula total with its balance state.
///
/// Balanced totals are green; under-filled ones show the remaining room;
/// over-filled ones show the excess.
pub fn render_total(total: f64) -> String {
    let label = format!("{total:.1}%");
    match PercentageStatus::of_total(total) {
        PercentageStatus::Balanced => {
            format!("{} {}", color_str(ICON_PASS, PASS), render_pass(&label))
        }
        PercentageStatus::Under => format!(
            "{} {} {}",
            color_str(ICON_WARN, WARN),
            render_warn(&label),
            render_muted(&format!("({:.1}% remaining)", percent::remaining_room(total)))
        ),
        PercentageStatus::Over => format!(
            "{} {} {}",
            color_str(ICON_FAIL, FAIL),
            render_fail(&label),
            render_muted(&format!("({:.1}% over)", total - percent::TARGET_TOTAL))
        ),
    }
}

/// Renders one ingredient line: order, name, id, percentage, grams, phase.
pub fn render_ingredient_line(line: &IngredientLine, grams: Option<f64>) -> String {
    let mut out = format!(
        "{:>3}. {} {} {:>6.1}%",
        line.order,
        line.display_name(),
        render_muted(&format!("({})", line.ingredient_id)),
        line.percentage
    );
    if let Some(g) = grams {
        out.push_str(&format!("  {g:>8.2} g"));
    }
    if let Some(phase) = line.phase() {
        out.push_str(&format!("  {}", render_muted(&format!("[{phase}]"))));
    }
    out
}

pub fn render_step_line(step: &ManufacturingStep) -> String {
    format!("{:>3}. {}", step.order, step.description)
}

/// Renders a compatibility issue as a warning.
pub fn render_compatibility_issue(issue: &CompatibilityIssue) -> String {
    format!(
        "{} {} + {}: {}",
        color_str(ICON_WARN, WARN),
        render_warn(&issue.first),
        render_warn(&issue.second),
        issue.description
    )
}

/// Renders an inline validation error.
pub fn render_validation_error(field: ValidationField, message: &str) -> String {
    format!(
        "{} {} {}",
        color_str(ICON_FAIL, FAIL),
        render_fail(field.as_str()),
        message
    )
}

/// Renders a collaborator error banner with the dismiss hint.
pub fn render_operation_error(op: Operation, message: &str) -> String {
    format!(
        "{} {}: {} {}",
        color_str(ICON_FAIL, FAIL),
        color_bold_str(op.as_str(), FAIL),
        message,
        render_muted(&format!("(dismiss {op})"))
    )
}

/// Renders an informational line.
pub fn render_info(message: &str) -> String {
    format!("{} {}", color_str(ICON_INFO, ACCENT), message)
}

/// Renders a catalog entry for the ingredient picker.
pub fn render_catalog_entry(entry: &CatalogIngredient) -> String {
    let mut out = format!("{} {}", entry.id, render_bold(entry.display_name()));
    if !entry.inci_name.is_empty() {
        out.push_str(&format!(" {}", render_muted(&format!("INCI: {}", entry.inci_name))));
    }
    if let Some(ref function) = entry.function {
        out.push_str(&format!("  {function}"));
    }
    if let Some(ref phase) = entry.phase {
        out.push_str(&format!("  {}", render_muted(&format!("[{phase}]"))));
    }
    if let Some(max) = entry.recommended_max_percentage {
        out.push_str(&format!("  {}", render_muted(&format!("max {max:.1}%"))));
    }
    if entry.is_premium {
        out.push_str(&format!("  {}", color_str("premium", PREMIUM)));
    }
    out
}
