//! Application configuration module.
//!
//! Handles loading, validating, and merging `folio.toml`. Stock defaults are
//! overridden by the user's file in the config directory (`.folio/` unless
//! `--config-dir` says otherwise).
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [preferences]
//! ui_dark = false           # Dark UI chrome (not the portfolio theme)
//! autosave = false          # Autosave once the portfolio has a file
//!
//! [autosave]
//! delay_ms = 1500           # Quiet period before an autosave fires
//!
//! [export]
//! page_size = "A4"          # "A4" or "Letter"
//! print_command = "chromium --headless --no-pdf-header-footer --print-to-pdf={output} {input}"
//!
//! [processing]
//! max_processes = 4         # Max image workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse, override just the values you want:
//!
//! ```toml
//! [preferences]
//! autosave = true
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const CONFIG_FILE: &str = "folio.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `folio.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// User-facing preferences (the "Preferences" dialog).
    pub preferences: PreferencesConfig,
    pub autosave: AutosaveConfig,
    /// PDF export settings.
    pub export: ExportConfig,
    /// Parallel image ingestion settings.
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.autosave.delay_ms == 0 {
            return Err(ConfigError::Validation(
                "autosave.delay_ms must be greater than 0".into(),
            ));
        }
        if let Some(command) = &self.export.print_command {
            if command.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "export.print_command must not be empty".into(),
                ));
            }
            if !command.contains("{output}") {
                return Err(ConfigError::Validation(
                    "export.print_command must contain {output}".into(),
                ));
            }
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreferencesConfig {
    pub ui_dark: bool,
    pub autosave: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutosaveConfig {
    pub delay_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self { delay_ms: 1500 }
    }
}

/// Printed page size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    /// Value for a CSS `@page { size: ... }` rule.
    pub fn css(self) -> &'static str {
        match self {
            PageSize::A4 => "A4",
            PageSize::Letter => "letter",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub page_size: PageSize,
    /// External HTML-to-PDF command. `{input}` is replaced with the rendered
    /// HTML file and `{output}` with the PDF path.
    pub print_command: Option<String>,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of image ingestion workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `folio.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `folio.toml` in the given directory.
pub fn load_config(dir: &Path) -> Result<AppConfig, ConfigError> {
    resolve_config(load_raw_config(dir)?)
}

/// Write `preferences` into `folio.toml`, leaving every other table as the
/// user wrote it.
pub fn save_preferences(dir: &Path, preferences: &PreferencesConfig) -> Result<(), ConfigError> {
    let mut root = match load_raw_config(dir)? {
        Some(toml::Value::Table(table)) => table,
        _ => toml::Table::new(),
    };
    root.insert(
        "preferences".to_string(),
        toml::Value::try_from(preferences)?,
    );
    fs::create_dir_all(dir)?;
    fs::write(dir.join(CONFIG_FILE), toml::to_string_pretty(&root)?)?;
    Ok(())
}

/// Returns a fully-commented stock `folio.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Folio Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Preferences
# ---------------------------------------------------------------------------
[preferences]
# Dark application chrome. Does not affect the portfolio's own theme.
ui_dark = false

# Save automatically after edits. Only applies once the portfolio has been
# saved to a file at least once.
autosave = false

# ---------------------------------------------------------------------------
# Autosave
# ---------------------------------------------------------------------------
[autosave]
# Milliseconds without further edits before an autosave fires.
delay_ms = 1500

# ---------------------------------------------------------------------------
# PDF export
# ---------------------------------------------------------------------------
[export]
# Printed page size: "A4" or "Letter". Pages are printed without margins.
page_size = "A4"

# Command that prints an HTML file to PDF. {input} is the rendered HTML,
# {output} the PDF to write.
# print_command = "chromium --headless --no-pdf-header-footer --print-to-pdf={output} {input}"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-ingestion workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
