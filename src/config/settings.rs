//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

/// Upper bound on the script timeout, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// InDesign automation settings.
    #[serde(default)]
    pub automation: AutomationConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.automation.application.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "automation.application must not be empty".to_string(),
            });
        }

        if !(1..=MAX_TIMEOUT_SECS).contains(&self.automation.timeout_secs) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid automation.timeout_secs {}. Must be between 1 and {MAX_TIMEOUT_SECS}",
                    self.automation.timeout_secs
                ),
            });
        }

        Ok(())
    }
}

/// InDesign automation configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutomationConfig {
    /// Application name scripts are addressed to.
    /// Default: "Adobe InDesign 2025"
    #[serde(default = "default_application")]
    pub application: String,

    /// Path to the `osascript` program.
    /// Default: "osascript" (resolved via `PATH`)
    #[serde(default = "default_osascript_path")]
    pub osascript_path: PathBuf,

    /// Seconds a script may run before it is killed.
    /// Default: 30
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            application: default_application(),
            osascript_path: default_osascript_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_application() -> String {
    "Adobe InDesign 2025".to_string()
}

fn default_osascript_path() -> PathBuf {
    PathBuf::from("osascript")
}

const fn default_timeout_secs() -> u64 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
