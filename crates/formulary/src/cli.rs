//! Clap CLI definitions for the `formulary` command.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// formulary -- compose cosmetic formulas.
///
/// Walks through basic details, an optional AI recommendation, ingredients,
/// manufacturing steps and a final review, keeping an unsaved draft
/// recoverable between sessions.
#[derive(Parser, Debug)]
#[command(
    name = "formulary",
    about = "Compose cosmetic formulas step by step",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Project directory (default: $FORMULARY_DIR, else nearest .formulary/).
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Fixture catalog file (overrides catalog.path from the config).
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create .formulary/ with a default config.
    Init(InitArgs),

    /// Run an interactive wizard session (commands are read from stdin).
    Wizard(WizardArgs),

    /// Inspect or discard the recoverable draft.
    Draft(DraftArgs),

    /// Search the ingredient catalog.
    Catalog(CatalogArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Fixture catalog to record in the config.
    #[arg(long = "with-catalog", value_name = "PATH")]
    pub with_catalog: Option<PathBuf>,

    /// Overwrite an existing config.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct WizardArgs {
    /// Discard any recoverable draft instead of restoring it.
    #[arg(long)]
    pub fresh: bool,
}

#[derive(Args, Debug)]
pub struct DraftArgs {
    #[command(subcommand)]
    pub command: DraftCommand,
}

#[derive(Subcommand, Debug)]
pub enum DraftCommand {
    /// Print the recoverable draft.
    Show,
    /// Delete the recoverable draft.
    Clear,
}

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Text to match against id, name and INCI name.
    pub query: Option<String>,

    /// Only ingredients in this phase.
    #[arg(long)]
    pub phase: Option<String>,

    /// Only ingredients with this function.
    #[arg(long)]
    pub function: Option<String>,

    /// Hide premium ingredients.
    #[arg(long)]
    pub no_premium: bool,
}
