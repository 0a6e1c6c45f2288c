//! `formulary` -- compose cosmetic formulas step by step.
//!
//! Parses CLI arguments with clap, resolves the runtime context
//! (`.formulary/` directory and configuration), and dispatches to command
//! handlers.

mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use context::RuntimeContext;

/// Filter used by `--verbose`.
const VERBOSE_FILTER: &str =
    "formulary=debug,formulary_wizard=debug,formulary_store=debug,formulary_api=debug";

fn main() {
    let cli = Cli::parse();

    let result = RuntimeContext::from_global_args(&cli.global).and_then(|ctx| {
        init_logging(&ctx);

        match cli.command {
            Some(Commands::Init(ref args)) => commands::init::run(&ctx, args),
            Some(Commands::Wizard(ref args)) => commands::wizard::run(&ctx, args),
            Some(Commands::Draft(ref args)) => commands::draft::run(&ctx, args),
            Some(Commands::Catalog(ref args)) => commands::catalog::run(&ctx, args),
            None => {
                // No subcommand -- print help
                use clap::CommandFactory;
                Cli::command().print_help().ok();
                println!();
                Ok(())
            }
        }
    });

    // Handle errors: print message and exit with code 1
    if let Err(e) = result {
        if cli.global.json {
            let err_json = serde_json::json!({
                "error": format!("{:#}", e),
            });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

/// Installs the stderr subscriber.
///
/// `RUST_LOG` wins, then `--verbose`, then `log.filter` from the config.
/// Without any of them nothing is logged.
fn init_logging(ctx: &RuntimeContext) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if ctx.verbose => EnvFilter::new(VERBOSE_FILTER),
        Err(_) => match ctx.config.log.filter.as_deref() {
            Some(directive) => EnvFilter::new(directive),
            None => return,
        },
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
