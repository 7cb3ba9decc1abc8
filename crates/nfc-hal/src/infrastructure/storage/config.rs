//! TOML-based configuration for the NFC HAL service.
//!
//! The file is optional.  `nfc-hal-service --config <PATH>` (or the
//! `NFC_HAL_CONFIG` environment variable) points at it; without one the
//! built-in defaults below are used.
//!
//! # What is TOML? (for beginners)
//!
//! TOML (Tom's Obvious Minimal Language) is a configuration file format made
//! of `[section]` headers followed by `key = value` lines.  It reads like an
//! INI file but has real types: strings are quoted, numbers and booleans are
//! not.  Example:
//!
//! ```toml
//! [service]
//! instance = "default"
//! log_level = "debug"
//!
//! [controller]
//! kind = "loopback"
//! open_delay_ms = 20
//! echo_writes = true
//! ```
//!
//! Each `[section]` maps onto one Rust struct below ([`ServiceConfig`],
//! [`ControllerConfig`]) and each key onto one field.  The `serde` library
//! generates the conversion code from the `#[derive(Serialize, Deserialize)]`
//! attributes at compile time, and the `toml` crate does the parsing.
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` take the value of
//! `some_fn()` when the key is missing from the file, and a missing section
//! falls back to that struct's `Default` impl.  An empty file, a file with
//! only `[controller]`, or no file at all therefore all produce a working
//! configuration.  Unknown `kind` values are still rejected as parse errors.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HalConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
}

/// Service identity and logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// Instance name passed to the factory.
    #[serde(default = "default_instance")]
    pub instance: String,
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Which controller backs the instance, and how it behaves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControllerConfig {
    #[serde(default)]
    pub kind: ControllerKind,
    /// Delay before the simulated controller reports `OPEN_CPLT`.
    #[serde(default = "default_open_delay_ms")]
    pub open_delay_ms: u64,
    /// Echo written frames back through the data callback.
    #[serde(default = "default_true")]
    pub echo_writes: bool,
}

/// Controller backends the service can construct by itself.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    /// In-process simulated controller.
    #[default]
    Loopback,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

fn default_instance() -> String {
    crate::application::factory::DEFAULT_INSTANCE.to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_open_delay_ms() -> u64 {
    20
}
fn default_true() -> bool {
    true
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            instance: default_instance(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            kind: ControllerKind::default(),
            open_delay_ms: default_open_delay_ms(),
            echo_writes: default_true(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl HalConfig {
    /// Parses a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// Loads configuration from `path`, or returns defaults when `path` is `None`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if it is not valid TOML for [`HalConfig`].
pub fn load_config(path: Option<&Path>) -> Result<HalConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(HalConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    HalConfig::from_toml(&text)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
