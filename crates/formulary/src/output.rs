//! Output formatting helpers for the `formulary` CLI.
//!
//! JSON output for `--json`, a plain table for catalog listings, and the
//! human-readable draft rendering shared by `draft show` and the wizard.

use std::io::{self, Write};

use formulary_core::formula::Formula;
use formulary_core::percent::PercentageStatus;
use formulary_store::FormulaStore;
use formulary_ui::styles;
use serde::Serialize;

/// JSON view of a draft with its derived totals.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftView<'a> {
    #[serde(flatten)]
    pub formula: &'a Formula,
    pub total_percentage: f64,
    pub balanced: bool,
}

impl<'a> DraftView<'a> {
    pub fn new(formula: &'a Formula) -> Self {
        let total = formula.total_percentage();
        Self {
            formula,
            total_percentage: total,
            balanced: PercentageStatus::of_total(total).is_balanced(),
        }
    }
}

/// Output a value as pretty-printed JSON to stdout.
pub fn output_json<T: Serialize>(value: &T) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    // Ignore broken pipe errors (e.g., piping to `head`)
    let _ = serde_json::to_writer_pretty(&mut handle, value);
    let _ = writeln!(handle);
}

/// Render a simple table with column headers.
pub fn output_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:<width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_line.join("  "));

    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("{}", separator.join("  "));

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:<width$}", cell, width = w)
            })
            .collect();
        println!("{}", line.join("  "));
    }
}

/// Writes the draft in human-readable form.
pub fn write_draft(out: &mut impl Write, draft: &Formula) -> io::Result<()> {
    let name = if draft.name.trim().is_empty() {
        styles::render_muted("(unnamed)")
    } else {
        styles::render_bold(&draft.name)
    };
    writeln!(out, "{name}")?;
    if !draft.description.is_empty() {
        writeln!(out, "  {}", draft.description)?;
    }
    writeln!(
        out,
        "  type: {}  weight: {} g  public: {}",
        if draft.product_type.as_str().is_empty() { "-" } else { draft.product_type.as_str() },
        draft.total_weight,
        if draft.is_public { "yes" } else { "no" }
    )?;

    writeln!(out, "{}", styles::render_category("Ingredients"))?;
    if draft.ingredients.is_empty() {
        writeln!(out, "  {}", styles::render_muted("none"))?;
    }
    let grams = draft.batch_quantities();
    for (line, qty) in draft.ingredients.iter().zip(grams.iter()) {
        writeln!(out, "{}", styles::render_ingredient_line(line, Some(qty.grams)))?;
    }
    writeln!(out, "  total: {}", styles::render_total(draft.total_percentage()))?;

    writeln!(out, "{}", styles::render_category("Steps"))?;
    if draft.steps.is_empty() {
        writeln!(out, "  {}", styles::render_muted("none"))?;
    }
    for step in &draft.steps {
        writeln!(out, "{}", styles::render_step_line(step))?;
    }
    Ok(())
}

/// Writes the store's warnings: compatibility issues and operation errors.
pub fn write_notices(out: &mut impl Write, store: &FormulaStore) -> io::Result<()> {
    for issue in store.compatibility_issues() {
        writeln!(out, "{}", styles::render_compatibility_issue(issue))?;
    }
    for (op, message) in store.status().errors() {
        writeln!(out, "{}", styles::render_operation_error(op, message))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use formulary_core::formula::FormulaBuilder;

    #[test]
    fn draft_view_reports_balance() {
        let draft = FormulaBuilder::new("Serum")
            .line("water", 95.0)
            .line("glycerin", 5.0)
            .build();
        let json = serde_json::to_value(DraftView::new(&draft)).unwrap();
        assert_eq!(json["name"], "Serum");
        assert_eq!(json["totalPercentage"], 100.0);
        assert_eq!(json["balanced"], true);
    }

    #[test]
    fn write_draft_lists_lines_and_steps() {
        let draft = FormulaBuilder::new("Serum")
            .product_type("serum")
            .line("water", 98.0)
            .step("Mix")
            .build();
        let mut buf = Vec::new();
        write_draft(&mut buf, &draft).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Serum"));
        assert!(text.contains("type: serum"));
        assert!(text.contains("98.0%"));
        assert!(text.contains("2.0% remaining"));
        assert!(text.contains("1. Mix"));
    }
}
