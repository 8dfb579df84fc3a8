//! Library settings for sqlift-rs.
//!
//! [`Settings`] carries the handful of process-wide defaults the compiler
//! consults: the parameter-name prefix used when minting placeholders, the
//! log level, and the debug flag controlling the log format. Settings can
//! be loaded from TOML or set programmatically; a global default is kept in
//! [`SETTINGS`].

use std::sync::RwLock;

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::{SqliftError, SqliftResult};

/// The default prefix for generated parameter names (`@sqlift_1`, ...).
pub const DEFAULT_PARAMETER_PREFIX: &str = "sqlift_";

/// Process-wide configuration for the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Prefix for generated parameter names. Must be non-blank: parameter
    /// names are minted as `<dialect prefix><prefix><n>`.
    pub parameter_prefix: String,
    /// Log level filter passed to the tracing subscriber (e.g. "info").
    pub log_level: String,
    /// When set, logs use a pretty human-readable format instead of JSON.
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            parameter_prefix: DEFAULT_PARAMETER_PREFIX.to_string(),
            log_level: "info".to_string(),
            debug: false,
        }
    }
}

impl Settings {
    /// Parses settings from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the document does not parse or the
    /// parameter prefix is blank.
    pub fn from_toml_str(input: &str) -> SqliftResult<Self> {
        let settings: Self = toml::from_str(input)
            .map_err(|e| SqliftError::ConfigurationError(format!("invalid settings TOML: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that the settings are usable.
    pub fn validate(&self) -> SqliftResult<()> {
        if self.parameter_prefix.trim().is_empty() {
            return Err(SqliftError::ConfigurationError(
                "parameter_prefix must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// The global settings instance consulted by compile entry points that are
/// not given an explicit prefix.
pub static SETTINGS: Lazy<RwLock<Settings>> = Lazy::new(|| RwLock::new(Settings::default()));

/// Replaces the global settings.
///
/// # Errors
///
/// Returns `ConfigurationError` if the settings fail validation.
pub fn configure(settings: Settings) -> SqliftResult<()> {
    settings.validate()?;
    *SETTINGS.write().expect("settings lock poisoned") = settings;
    Ok(())
}

/// Returns a snapshot of the global settings.
pub fn current() -> Settings {
    SETTINGS.read().expect("settings lock poisoned").clone()
}
