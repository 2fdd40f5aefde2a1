//! Configuration for the Warble bot extensions.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level configuration, loaded from a TOML file.
///
/// Every field has a default, so an empty file (or a missing section) yields
/// a working configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Auth gate configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format: "json" or "pretty" (default: "pretty")
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

/// Auth gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Prefix the command layer strips before dispatching commands
    /// (default: "!"). Only used here to render usage help.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Path to the SQLite account database; `~` expands to the home
    /// directory (default: "~/.warble/accounts.db")
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_database_path() -> String {
    "~/.warble/accounts.db".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            database_path: default_database_path(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))
    }
}

impl AuthConfig {
    /// The account database path with `~` expanded.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database_path).into_owned())
    }
}
