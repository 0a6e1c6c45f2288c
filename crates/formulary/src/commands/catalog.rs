//! `formulary catalog` -- search the ingredient catalog.

use anyhow::{Context, Result};
use formulary_api::FixtureCatalog;
use formulary_core::catalog::CatalogQuery;

use crate::cli::CatalogArgs;
use crate::context::RuntimeContext;
use crate::output::{output_json, output_table};

/// Execute the `formulary catalog` command.
pub fn run(ctx: &RuntimeContext, args: &CatalogArgs) -> Result<()> {
    let path = ctx.catalog_path()?;
    let fixture = FixtureCatalog::load(&path)
        .with_context(|| format!("failed to load catalog {}", path.display()))?
        .sanitized();

    let query = CatalogQuery {
        text: args.query.clone().unwrap_or_default(),
        phase: args.phase.clone(),
        function: args.function.clone(),
        exclude_premium: args.no_premium,
        ..CatalogQuery::default()
    };
    let matches = query.apply(&fixture.ingredients);

    if ctx.json {
        output_json(&matches);
        return Ok(());
    }

    if matches.is_empty() {
        println!("No matching ingredients.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = matches
        .iter()
        .map(|e| {
            vec![
                e.id.clone(),
                e.display_name().to_string(),
                e.phase.clone().unwrap_or_default(),
                e.function.clone().unwrap_or_default(),
                e.recommended_max_percentage
                    .map(|m| format!("{m:.1}%"))
                    .unwrap_or_default(),
                if e.is_premium { "yes".into() } else { String::new() },
            ]
        })
        .collect();
    output_table(&["ID", "NAME", "PHASE", "FUNCTION", "MAX", "PREMIUM"], &rows);
    if !ctx.quiet {
        println!("\n{} ingredient(s)", matches.len());
    }
    Ok(())
}
