//! `formulary draft` -- inspect or discard the recoverable draft.

use std::io;

use anyhow::{Context, Result};
use formulary_store::DraftStorage;

use crate::cli::{DraftArgs, DraftCommand};
use crate::context::RuntimeContext;
use crate::output::{DraftView, output_json, write_draft};

/// Execute the `formulary draft` command.
pub fn run(ctx: &RuntimeContext, args: &DraftArgs) -> Result<()> {
    let storage = ctx.draft_storage()?;

    match args.command {
        DraftCommand::Show => {
            let draft = storage
                .load()
                .with_context(|| format!("failed to read {}", storage.path().display()))?;
            match draft {
                Some(mut draft) => {
                    draft.normalize();
                    if ctx.json {
                        output_json(&DraftView::new(&draft));
                    } else {
                        write_draft(&mut io::stdout().lock(), &draft)?;
                    }
                }
                None if ctx.json => output_json(&serde_json::Value::Null),
                None => println!("No recoverable draft."),
            }
        }
        DraftCommand::Clear => {
            storage
                .clear()
                .with_context(|| format!("failed to clear {}", storage.path().display()))?;
            if ctx.json {
                output_json(&serde_json::json!({ "cleared": true }));
            } else if !ctx.quiet {
                println!("Recoverable draft cleared.");
            }
        }
    }
    Ok(())
}
