//! `formulary wizard` -- interactive formula composition.
//!
//! Reads one command per line from stdin and drives a [`WizardController`]
//! on a single-threaded tokio runtime. Collaborator calls (generation, save,
//! compatibility checks) run on that runtime; the session awaits them only
//! where the command needs the answer.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use formulary_api::FormulaApi;
use formulary_core::enums::{Operation, ProductType, WizardStep};
use formulary_core::payload::{GenerationRequest, SkinConcerns};
use formulary_core::validation::ValidationField;
use formulary_store::{DraftStorage, FieldUpdate};
use formulary_ui::{styles, terminal};
use formulary_wizard::WizardController;
use tracing::debug;

use crate::cli::WizardArgs;
use crate::context::RuntimeContext;
use crate::output::{write_draft, write_notices};

/// Extra time allowed for a compatibility check on top of the debounce.
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

const HELP: &str = "\
Commands:
  set name|description|type|weight|public <value>
  add <ingredient-id> [percentage]    rm <ingredient-id>
  pct <ingredient-id> <percentage>    move <ingredient-id> <position>
  step add <text>    step edit <n> <text>    step rm <n>
  next    back    goto <0-4|basic|ai|ingredients|steps|review>
  generate [prefer=a,b] [avoid=c,d] [concerns=x,y|profile]
  check    save    reset [yes]    show    catalog [query]
  dismiss <operation>    help    quit";

/// Execute the `formulary wizard` command.
pub fn run(ctx: &RuntimeContext, args: &WizardArgs) -> Result<()> {
    let api: Arc<dyn FormulaApi> = ctx.api()?;
    let storage = ctx.draft_storage()?;
    if args.fresh {
        storage
            .clear()
            .with_context(|| format!("failed to clear {}", storage.path().display()))?;
    }
    let debounce = ctx.config.debounce();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    runtime.block_on(async {
        let controller = WizardController::new(api, Box::new(storage), debounce);
        let stdin = io::stdin();
        let stdout = io::stdout();
        let mut session = Session {
            controller,
            input: stdin.lock(),
            out: stdout.lock(),
            interactive: terminal::interactive_session(),
            quiet: ctx.quiet,
            check_timeout: debounce + CHECK_TIMEOUT,
        };
        session.run().await
    })
}

// ---------------------------------------------------------------------------
// Command parsing
// ---------------------------------------------------------------------------

/// One line of wizard input.
#[derive(Debug, Clone, PartialEq)]
enum WizardCommand {
    Set(FieldUpdate),
    Add { id: String, percentage: Option<f64> },
    Remove(String),
    Percentage { id: String, raw: String },
    Move { id: String, position: usize },
    StepAdd(String),
    StepEdit { order: u32, text: String },
    StepRemove(u32),
    Next,
    Back,
    GoTo(WizardStep),
    Generate(GenerateOptions),
    Check,
    Save,
    Reset { confirmed: bool },
    Show,
    Catalog(String),
    Dismiss(Operation),
    Help,
    Quit,
}

/// Options of `generate`, applied on top of the draft's product type.
#[derive(Debug, Clone, Default, PartialEq)]
struct GenerateOptions {
    prefer: Vec<String>,
    avoid: Vec<String>,
    concerns: Option<SkinConcerns>,
}

impl GenerateOptions {
    fn apply(self, mut request: GenerationRequest) -> GenerationRequest {
        for id in self.prefer {
            request = request.prefer(id);
        }
        for id in self.avoid {
            request = request.avoid(id);
        }
        if let Some(concerns) = self.concerns {
            request = request.concerns(concerns);
        }
        request
    }
}

/// Parses one input line. `Ok(None)` for blank lines and `#` comments.
fn parse_command(line: &str) -> Result<Option<WizardCommand>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (verb, rest) = split_word(line);

    let cmd = match verb {
        "set" => parse_set(rest)?,
        "add" => {
            let (id, pct) = split_word(rest);
            if id.is_empty() {
                return Err("usage: add <ingredient-id> [percentage]".into());
            }
            let percentage = if pct.is_empty() {
                None
            } else {
                Some(parse_number(pct).ok_or_else(|| format!("not a percentage: {pct}"))?)
            };
            WizardCommand::Add { id: id.to_string(), percentage }
        }
        "rm" | "remove" => {
            let (id, _) = split_word(rest);
            if id.is_empty() {
                return Err("usage: rm <ingredient-id>".into());
            }
            WizardCommand::Remove(id.to_string())
        }
        "pct" => {
            let (id, raw) = split_word(rest);
            if id.is_empty() {
                return Err("usage: pct <ingredient-id> <percentage>".into());
            }
            WizardCommand::Percentage { id: id.to_string(), raw: raw.to_string() }
        }
        "move" => {
            let (id, pos) = split_word(rest);
            let position = pos
                .parse::<usize>()
                .map_err(|_| "usage: move <ingredient-id> <position>".to_string())?;
            WizardCommand::Move { id: id.to_string(), position }
        }
        "step" => parse_step(rest)?,
        "next" => WizardCommand::Next,
        "back" | "previous" => WizardCommand::Back,
        "goto" => WizardCommand::GoTo(parse_step_name(rest)?),
        "generate" => WizardCommand::Generate(parse_generate(rest)?),
        "check" => WizardCommand::Check,
        "save" => WizardCommand::Save,
        "reset" => WizardCommand::Reset { confirmed: is_yes(rest) },
        "show" => WizardCommand::Show,
        "catalog" => WizardCommand::Catalog(rest.to_string()),
        "dismiss" => WizardCommand::Dismiss(
            Operation::parse(rest).ok_or_else(|| format!("unknown operation: {rest}"))?,
        ),
        "help" | "?" => WizardCommand::Help,
        "quit" | "exit" => WizardCommand::Quit,
        other => return Err(format!("unknown command: {other} (try 'help')")),
    };
    Ok(Some(cmd))
}

fn parse_set(rest: &str) -> Result<WizardCommand, String> {
    let (field, value) = split_word(rest);
    let update = match field {
        "name" => FieldUpdate::Name(value.to_string()),
        "description" => FieldUpdate::Description(value.to_string()),
        "type" => FieldUpdate::ProductType(ProductType::from(value)),
        "public" => FieldUpdate::IsPublic(is_yes(value)),
        "weight" => FieldUpdate::TotalWeight(
            value
                .trim_end_matches('g')
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("not a weight: {value}"))?,
        ),
        _ => return Err("usage: set name|description|type|weight|public <value>".into()),
    };
    Ok(WizardCommand::Set(update))
}

fn parse_step(rest: &str) -> Result<WizardCommand, String> {
    let (action, rest) = split_word(rest);
    match action {
        "add" => Ok(WizardCommand::StepAdd(rest.to_string())),
        "edit" => {
            let (order, text) = split_word(rest);
            let order = order
                .parse()
                .map_err(|_| "usage: step edit <n> <text>".to_string())?;
            Ok(WizardCommand::StepEdit { order, text: text.to_string() })
        }
        "rm" | "remove" => rest
            .parse()
            .map(WizardCommand::StepRemove)
            .map_err(|_| "usage: step rm <n>".to_string()),
        _ => Err("usage: step add|edit|rm ...".into()),
    }
}

fn parse_step_name(name: &str) -> Result<WizardStep, String> {
    let step = match name.trim().to_ascii_lowercase().as_str() {
        "0" | "basic" | "details" => WizardStep::BasicDetails,
        "1" | "ai" | "recommendation" => WizardStep::AiRecommendation,
        "2" | "ingredients" => WizardStep::Ingredients,
        "3" | "steps" | "manufacturing" => WizardStep::ManufacturingSteps,
        "4" | "review" => WizardStep::Review,
        other => return Err(format!("unknown step: {other}")),
    };
    Ok(step)
}

fn parse_generate(rest: &str) -> Result<GenerateOptions, String> {
    let mut opts = GenerateOptions::default();
    for word in rest.split_whitespace() {
        let (key, value) = word
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got: {word}"))?;
        let list: Vec<String> = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        match key {
            "prefer" => opts.prefer.extend(list),
            "avoid" => opts.avoid.extend(list),
            "concerns" if value == "profile" => opts.concerns = Some(SkinConcerns::FromProfile),
            "concerns" => opts.concerns = Some(SkinConcerns::Explicit(list)),
            other => return Err(format!("unknown generate option: {other}")),
        }
    }
    Ok(opts)
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (s, ""),
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    raw.strip_suffix('%').unwrap_or(raw).trim().parse().ok()
}

fn is_yes(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "y" | "yes" | "true")
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

struct Session<R, W> {
    controller: WizardController,
    input: R,
    out: W,
    interactive: bool,
    quiet: bool,
    check_timeout: Duration,
}

impl<R: BufRead, W: Write> Session<R, W> {
    async fn run(&mut self) -> Result<()> {
        if self.controller.initialize().await {
            writeln!(self.out, "{}", styles::render_info("Restored unsaved draft."))?;
        }
        write_notices(&mut self.out, self.controller.store())?;
        self.print_step()?;

        while let Some(line) = self.read_line("> ")? {
            let cmd = match parse_command(&line) {
                Ok(Some(cmd)) => cmd,
                Ok(None) => continue,
                Err(message) => {
                    writeln!(self.out, "{}", styles::render_fail(&message))?;
                    continue;
                }
            };
            debug!(?cmd, "wizard command");
            if cmd == WizardCommand::Quit {
                break;
            }
            self.execute(cmd).await?;
            self.collect_compatibility().await?;
        }

        if self.controller.store().is_dirty() && !self.quiet {
            writeln!(
                self.out,
                "{}",
                styles::render_info("Unsaved draft kept for recovery.")
            )?;
        }
        Ok(())
    }

    async fn execute(&mut self, cmd: WizardCommand) -> Result<()> {
        match cmd {
            WizardCommand::Set(update) => {
                let field = update.field();
                self.controller.store_mut().update_field(update);
                writeln!(self.out, "{field} updated")?;
            }
            WizardCommand::Add { id, percentage } => self.add(&id, percentage)?,
            WizardCommand::Remove(id) => {
                if self.controller.store_mut().remove_ingredient(&id) {
                    writeln!(self.out, "Removed {id}")?;
                    self.print_total()?;
                } else {
                    self.warn(&format!("{id} is not in the formula"))?;
                }
            }
            WizardCommand::Percentage { id, raw } => {
                if self.controller.store_mut().update_ingredient_percentage(&id, &raw) {
                    self.print_total()?;
                } else {
                    self.warn(&format!("{id} is not in the formula"))?;
                }
            }
            WizardCommand::Move { id, position } => {
                if self.controller.store_mut().move_ingredient(&id, position) {
                    writeln!(self.out, "Moved {id}")?;
                } else {
                    self.warn(&format!("{id} is not in the formula"))?;
                }
            }
            WizardCommand::StepAdd(text) => {
                if self.controller.store_mut().add_step(&text) {
                    let n = self.controller.store().draft().steps.len();
                    writeln!(self.out, "Added step {n}")?;
                } else {
                    self.warn("Step description is empty")?;
                }
            }
            WizardCommand::StepEdit { order, text } => {
                if !self.controller.store_mut().update_step(order, &text) {
                    self.warn(&format!("Cannot edit step {order}"))?;
                }
            }
            WizardCommand::StepRemove(order) => {
                if !self.controller.store_mut().remove_step(order) {
                    self.warn(&format!("No step {order}"))?;
                }
            }
            WizardCommand::Next => {
                if self.controller.current_step().is_terminal() {
                    writeln!(self.out, "Already on the last step; use 'save'.")?;
                } else if self.controller.next() {
                    self.print_step()?;
                } else {
                    self.print_validation_errors()?;
                }
            }
            WizardCommand::Back => {
                self.controller.previous();
                self.print_step()?;
            }
            WizardCommand::GoTo(step) => {
                if self.controller.go_to(step) {
                    self.print_step()?;
                } else {
                    self.print_validation_errors()?;
                }
            }
            WizardCommand::Generate(opts) => {
                let request = opts.apply(self.controller.generation_request());
                writeln!(self.out, "Generating a {} formula...", request.product_type)?;
                if self.controller.generate_recommendation(request).await {
                    writeln!(self.out, "{}", styles::render_pass("Recommendation applied."))?;
                    self.print_step()?;
                } else {
                    self.print_operation_error(Operation::FormulaGeneration)?;
                }
            }
            WizardCommand::Check => {
                if self.controller.store().compatibility_pending()
                    && !self.controller.await_compatibility(self.check_timeout).await
                {
                    self.warn("Compatibility check still running")?;
                    return Ok(());
                }
                let store = self.controller.store();
                if store.compatibility_issues().is_empty() {
                    writeln!(self.out, "{}", styles::render_pass("No compatibility issues."))?;
                } else {
                    for issue in store.compatibility_issues() {
                        writeln!(self.out, "{}", styles::render_compatibility_issue(issue))?;
                    }
                }
            }
            WizardCommand::Save => self.save().await?,
            WizardCommand::Reset { confirmed } => {
                let input = &mut self.input;
                let out = &mut self.out;
                let interactive = self.interactive;
                let reset = self.controller.reset_with_confirmation(|| {
                    confirmed || (interactive && confirm(input, out, "Discard the draft? [y/N] "))
                });
                if reset {
                    writeln!(self.out, "Draft discarded.")?;
                    self.print_step()?;
                } else {
                    writeln!(self.out, "Reset cancelled (use 'reset yes' to confirm).")?;
                }
            }
            WizardCommand::Show => {
                write_draft(&mut self.out, self.controller.store().draft())?;
                write_notices(&mut self.out, self.controller.store())?;
            }
            WizardCommand::Catalog(text) => self.list_catalog(&text)?,
            WizardCommand::Dismiss(op) => {
                if !self.controller.store_mut().dismiss_error(op) {
                    writeln!(self.out, "No {op} error to dismiss")?;
                }
            }
            WizardCommand::Help => writeln!(self.out, "{HELP}")?,
            WizardCommand::Quit => {}
        }
        Ok(())
    }

    fn add(&mut self, id: &str, percentage: Option<f64>) -> Result<()> {
        let store = self.controller.store_mut();
        if store.draft().contains_ingredient(id) {
            self.warn(&format!("{id} is already in the formula"))?;
            return Ok(());
        }
        if !store.add_ingredient_by_id(id, percentage) {
            self.warn(&format!("Unknown ingredient: {id}"))?;
            return Ok(());
        }
        if let Some(line) = self.controller.store().draft().line(id) {
            writeln!(self.out, "Added {} at {:.1}%", line.display_name(), line.percentage)?;
        }
        self.print_total()
    }

    async fn save(&mut self) -> Result<()> {
        if !self.controller.current_step().is_terminal() {
            self.warn("Saving is only available on the Review step.")?;
            return Ok(());
        }
        match self.controller.save().await {
            Some(saved) => writeln!(
                self.out,
                "{} Saved formula {}",
                styles::render_pass(styles::ICON_PASS),
                saved.id
            )?,
            None => self.print_operation_error(Operation::FormulaSaving)?,
        }
        Ok(())
    }

    fn list_catalog(&mut self, text: &str) -> Result<()> {
        let store = self.controller.store();
        let mut query = formulary_core::catalog::CatalogQuery::text(text);
        query.exclude_ids = store.draft().ingredient_ids().into_iter().collect();
        let matches = query.apply(store.catalog());
        if matches.is_empty() {
            writeln!(self.out, "No matching ingredients.")?;
        }
        for entry in matches {
            writeln!(self.out, "  {}", styles::render_catalog_entry(entry))?;
        }
        Ok(())
    }

    /// Applies compatibility results that arrived while the command ran.
    async fn collect_compatibility(&mut self) -> Result<()> {
        tokio::task::yield_now().await;
        if self.controller.drain_compatibility() > 0 {
            for issue in self.controller.store().compatibility_issues() {
                writeln!(self.out, "{}", styles::render_compatibility_issue(issue))?;
            }
        }
        Ok(())
    }

    fn print_step(&mut self) -> Result<()> {
        let step = self.controller.current_step();
        writeln!(self.out, "{}", styles::render_step_header(step))?;
        if step == WizardStep::AiRecommendation {
            writeln!(
                self.out,
                "{}",
                styles::render_muted("Optional: 'generate' for a recommendation or 'next' to skip.")
            )?;
        }
        Ok(())
    }

    fn warn(&mut self, message: &str) -> Result<()> {
        writeln!(self.out, "{}", styles::render_warn(message))?;
        Ok(())
    }

    fn print_total(&mut self) -> Result<()> {
        let total = self.controller.store().draft().total_percentage();
        writeln!(self.out, "Total: {}", styles::render_total(total))?;
        Ok(())
    }

    fn print_validation_errors(&mut self) -> Result<()> {
        let errors: Vec<(ValidationField, String)> = self
            .controller
            .validation_errors()
            .iter()
            .map(|(f, m)| (f, m.to_string()))
            .collect();
        for (field, message) in errors {
            writeln!(self.out, "{}", styles::render_validation_error(field, &message))?;
        }
        Ok(())
    }

    fn print_operation_error(&mut self, op: Operation) -> Result<()> {
        if let Some(message) = self.controller.store().status().error(op) {
            writeln!(self.out, "{}", styles::render_operation_error(op, message))?;
        }
        Ok(())
    }

    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        if self.interactive {
            let step = self.controller.current_step();
            write!(self.out, "[{}] {prompt}", step.index())?;
        }
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// Asks a yes/no question on the session's own streams.
fn confirm(input: &mut impl BufRead, out: &mut impl Write, question: &str) -> bool {
    if write!(out, "{question}").and_then(|_| out.flush()).is_err() {
        return false;
    }
    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(n) if n > 0 => is_yes(&answer),
        _ => false,
    }
}
