//! Configuration types and loading for the formulary system.
//!
//! The main entry point is [`FormularyConfig`], which represents the
//! contents of `.formulary/config.yaml`. Configuration is loaded with
//! [`load_config`] (file values, then `FORMULARY_*` environment overrides)
//! and saved with [`save_config`].
//!
//! Relative paths in the file are resolved against the `.formulary/`
//! directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The configuration file contained invalid YAML.
    #[error("failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Merging file and environment values failed.
    #[error("failed to load configuration: {0}")]
    ExtractError(#[from] Box<figment::Error>),

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue {
        /// The configuration key that had an invalid value.
        key: String,
        /// A description of why the value is invalid.
        reason: String,
    },
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Prefix of environment variables that override file values.
///
/// Sections are separated by a double underscore:
/// `FORMULARY_COMPATIBILITY__DEBOUNCE_MS=50`.
pub const ENV_PREFIX: &str = "FORMULARY_";

/// File name of the configuration inside `.formulary/`.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Recoverable draft slot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftConfig {
    /// Slot file, relative to `.formulary/`.
    #[serde(default = "default_draft_path")]
    pub path: String,

    /// Slot name stored inside the file; a mismatching slot is ignored.
    #[serde(default = "default_draft_key")]
    pub key: String,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            path: default_draft_path(),
            key: default_draft_key(),
        }
    }
}

fn default_draft_path() -> String {
    "draft.json".to_string()
}

fn default_draft_key() -> String {
    "formulary.draft".to_string()
}

/// Fixture catalog configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// TOML or JSON fixture file, relative to `.formulary/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Compatibility recheck configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityConfig {
    /// Quiet period after the last ingredient edit before checking.
    #[serde(default = "default_debounce_ms", rename = "debounce-ms")]
    pub debounce_ms: u64,
}

impl Default for CompatibilityConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    300
}

/// Save target configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveConfig {
    /// Directory saved formulas are written to, relative to `.formulary/`.
    #[serde(default = "default_output_dir", rename = "output-dir")]
    pub output_dir: String,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "formulas".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` env-filter directive, e.g. `formulary=debug`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

// ---------------------------------------------------------------------------
// Main config struct
// ---------------------------------------------------------------------------

/// The full formulary configuration, corresponding to `.formulary/config.yaml`.
///
/// All sections use `serde` defaults so that a partially-specified YAML file
/// deserializes with sensible values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormularyConfig {
    #[serde(default)]
    pub draft: DraftConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub compatibility: CompatibilityConfig,

    #[serde(default)]
    pub save: SaveConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl FormularyConfig {
    /// Checks values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.draft.key.trim().is_empty() {
            return Err(ConfigError::invalid("draft.key", "must not be empty"));
        }
        if self.draft.path.trim().is_empty() {
            return Err(ConfigError::invalid("draft.path", "must not be empty"));
        }
        if self.save.output_dir.trim().is_empty() {
            return Err(ConfigError::invalid("save.output-dir", "must not be empty"));
        }
        Ok(())
    }

    pub fn draft_path(&self, formulary_dir: &Path) -> PathBuf {
        resolve(formulary_dir, &self.draft.path)
    }

    pub fn catalog_path(&self, formulary_dir: &Path) -> Option<PathBuf> {
        self.catalog
            .path
            .as_deref()
            .map(|p| resolve(formulary_dir, p))
    }

    pub fn output_dir(&self, formulary_dir: &Path) -> PathBuf {
        resolve(formulary_dir, &self.save.output_dir)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.compatibility.debounce_ms)
    }
}

fn resolve(base: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Load configuration from `config.yaml` inside the given `.formulary/`
/// directory, with `FORMULARY_*` environment overrides.
///
/// A missing or empty file yields the defaults.
pub fn load_config(formulary_dir: &Path) -> Result<FormularyConfig> {
    load_config_with_prefix(formulary_dir, ENV_PREFIX)
}

/// [`load_config`] with a custom environment prefix.
pub fn load_config_with_prefix(formulary_dir: &Path, env_prefix: &str) -> Result<FormularyConfig> {
    let config_path = formulary_dir.join(CONFIG_FILE_NAME);

    let mut figment = Figment::from(Serialized::defaults(FormularyConfig::default()));

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        // An empty file is valid and yields default config.
        if !content.trim().is_empty() {
            // Surface YAML syntax errors with serde_yaml's messages.
            serde_yaml::from_str::<serde_yaml::Value>(&content)?;
            figment = figment.merge(Yaml::string(&content));
        }
    }

    // FORMULARY_SAVE__OUTPUT_DIR -> save.output-dir
    let env = Env::prefixed(env_prefix)
        .split("__")
        .map(|key| key.as_str().replace('_', "-").into());
    let config: FormularyConfig = figment.merge(env).extract().map_err(Box::new)?;

    config.validate()?;
    Ok(config)
}

/// Save configuration to `config.yaml` inside the given `.formulary/`
/// directory, creating the directory if needed.
pub fn save_config(formulary_dir: &Path, config: &FormularyConfig) -> Result<()> {
    std::fs::create_dir_all(formulary_dir)?;

    let config_path = formulary_dir.join(CONFIG_FILE_NAME);
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(config_path, yaml)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
