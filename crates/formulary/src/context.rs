//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds what every command handler needs: the
//! resolved `.formulary/` directory, the loaded configuration and the global
//! output flags.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use formulary_api::FixtureApi;
use formulary_config::config::{self, FormularyConfig};
use formulary_config::formulary_dir;
use formulary_store::FileDraftStorage;

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext {
    /// Resolved `.formulary/` directory, if one was found.
    pub formulary_dir: Option<PathBuf>,

    /// Whether `formulary_dir` came from `--dir`.
    pub explicit_dir: bool,

    /// Configuration loaded from `formulary_dir`, or defaults.
    pub config: FormularyConfig,

    /// `--catalog` override.
    pub catalog_override: Option<PathBuf>,

    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Quiet mode: suppress non-essential output.
    pub quiet: bool,
}

impl RuntimeContext {
    /// Build a `RuntimeContext` from parsed global arguments.
    ///
    /// The directory comes from `--dir`, else `$FORMULARY_DIR`, else the
    /// nearest `.formulary/` above the working directory. No directory is
    /// not an error here; commands that need one call [`Self::require_dir`].
    pub fn from_global_args(global: &GlobalArgs) -> Result<Self> {
        let formulary_dir = match global.dir {
            Some(ref dir) => Some(normalize_dir(dir)),
            None => {
                let cwd = env::current_dir().context("failed to read the working directory")?;
                formulary_dir::find_formulary_dir(&cwd)
            }
        };

        let config = match formulary_dir {
            Some(ref dir) if dir.is_dir() => config::load_config(dir)
                .with_context(|| format!("failed to load config from {}", dir.display()))?,
            _ => FormularyConfig::default(),
        };

        Ok(Self {
            formulary_dir,
            explicit_dir: global.dir.is_some(),
            config,
            catalog_override: global.catalog.clone(),
            json: global.json,
            verbose: global.verbose,
            quiet: global.quiet,
        })
    }

    /// The `.formulary/` directory, or an error telling the user to init.
    pub fn require_dir(&self) -> Result<&Path> {
        match self.formulary_dir {
            Some(ref dir) if dir.is_dir() => Ok(dir),
            Some(ref dir) => bail!("{} does not exist (run 'formulary init')", dir.display()),
            None => bail!("no .formulary directory found (run 'formulary init')"),
        }
    }

    /// The recoverable draft slot configured for this project.
    pub fn draft_storage(&self) -> Result<FileDraftStorage> {
        let dir = self.require_dir()?;
        Ok(FileDraftStorage::new(
            self.config.draft_path(dir),
            self.config.draft.key.clone(),
        ))
    }

    /// Path of the fixture catalog: `--catalog`, else `catalog.path`.
    pub fn catalog_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.catalog_override {
            return Ok(path.clone());
        }
        let dir = self.require_dir()?;
        match self.config.catalog_path(dir) {
            Some(path) => Ok(path),
            None => bail!(
                "no catalog configured (set catalog.path in {}/{} or pass --catalog)",
                dir.display(),
                config::CONFIG_FILE_NAME
            ),
        }
    }

    /// The backend for this project, saving into the configured output dir.
    pub fn api(&self) -> Result<Arc<FixtureApi>> {
        let dir = self.require_dir()?;
        let path = self.catalog_path()?;
        let api = FixtureApi::from_file(&path)
            .with_context(|| format!("failed to load catalog {}", path.display()))?
            .with_output_dir(self.config.output_dir(dir));
        Ok(Arc::new(api))
    }
}

/// Accepts either the project root or the `.formulary/` directory itself.
fn normalize_dir(dir: &Path) -> PathBuf {
    if dir.ends_with(formulary_dir::FORMULARY_DIR_NAME) {
        dir.to_path_buf()
    } else {
        dir.join(formulary_dir::FORMULARY_DIR_NAME)
    }
}
