//! `formulary init` -- create the `.formulary/` project directory.

use std::env;
use std::fs;

use anyhow::{Context, Result, bail};
use formulary_api::FixtureCatalog;
use formulary_config::config::{self, FormularyConfig};
use formulary_config::formulary_dir::{self, FORMULARY_DIR_NAME};

use crate::cli::InitArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Default gitignore content for the `.formulary` directory.
const GITIGNORE_CONTENT: &str = r#"# Recoverable draft slot
draft.json
*.lock
*.tmp
"#;

/// Execute the `formulary init` command.
pub fn run(ctx: &RuntimeContext, args: &InitArgs) -> Result<()> {
    let target = match ctx.formulary_dir {
        Some(ref dir) if ctx.explicit_dir => dir.clone(),
        _ => env::current_dir()
            .context("failed to get current directory")?
            .join(FORMULARY_DIR_NAME),
    };

    let config_path = target.join(config::CONFIG_FILE_NAME);
    if !args.force && config_path.exists() {
        bail!(
            "Found existing config in {}\n\n\
            This project is already initialized.\n\
            Use --force to overwrite the config.",
            target.display()
        );
    }

    let mut cfg = FormularyConfig::default();
    if let Some(ref catalog) = args.with_catalog {
        let path = fs::canonicalize(catalog)
            .with_context(|| format!("catalog not found: {}", catalog.display()))?;
        let fixture = FixtureCatalog::load(&path)
            .with_context(|| format!("failed to load catalog {}", path.display()))?;
        tracing::debug!(ingredients = fixture.ingredients.len(), "catalog checked");
        cfg.catalog.path = Some(path.to_string_lossy().into_owned());
    }

    let dir = formulary_dir::ensure_formulary_dir(&target)
        .with_context(|| format!("failed to create directory: {}", target.display()))?;

    let gitignore_path = dir.join(".gitignore");
    if !gitignore_path.exists() {
        fs::write(&gitignore_path, GITIGNORE_CONTENT).with_context(|| {
            format!("failed to create .gitignore: {}", gitignore_path.display())
        })?;
    }

    config::save_config(&dir, &cfg)
        .with_context(|| format!("failed to write config in {}", dir.display()))?;

    if ctx.json {
        output_json(&serde_json::json!({
            "dir": dir.display().to_string(),
            "catalog": cfg.catalog.path,
        }));
    } else if !ctx.quiet {
        println!("Initialized formulary project in {}", dir.display());
        match cfg.catalog.path {
            Some(ref path) => println!("  catalog: {path}"),
            None => println!("  no catalog yet: set catalog.path in {}", config_path.display()),
        }
    }
    Ok(())
}
