//! Core configuration.
//!
//! # Responsibility
//! - Hold the tunables shared by sessions and the storage layer.
//! - Normalize values coming from flags or environment variables.
//!
//! # Invariants
//! - A constructed `CoreConfig` always has a non-blank passphrase and title.
//! - `storage_quota_bytes`, when set, is greater than zero.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Passphrase expected by the unlock gate.
pub const DEFAULT_PASSPHRASE: &str = "RudraPad";
/// Title given to freshly created notes.
pub const DEFAULT_NOTE_TITLE: &str = "New Note";
/// Per-origin storage budget, matching common browser local storage limits.
pub const DEFAULT_STORAGE_QUOTA_BYTES: usize = 5 * 1024 * 1024;

pub const ENV_LOG_LEVEL: &str = "RUDRAPAD_LOG_LEVEL";
pub const ENV_STORAGE_QUOTA: &str = "RUDRAPAD_STORAGE_QUOTA";
pub const ENV_NOTE_TITLE: &str = "RUDRAPAD_NOTE_TITLE";

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    BlankPassphrase,
    BlankNoteTitle,
    InvalidLogLevel(String),
    InvalidQuota(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankPassphrase => write!(f, "passphrase must not be blank"),
            Self::BlankNoteTitle => write!(f, "default note title must not be blank"),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
            Self::InvalidQuota(value) => {
                write!(f, "storage quota must be a positive byte count, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Runtime configuration for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub passphrase: String,
    pub default_note_title: String,
    /// `None` disables quota enforcement.
    pub storage_quota_bytes: Option<usize>,
    pub log_level: &'static str,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            passphrase: DEFAULT_PASSPHRASE.to_string(),
            default_note_title: DEFAULT_NOTE_TITLE.to_string(),
            storage_quota_bytes: Some(DEFAULT_STORAGE_QUOTA_BYTES),
            log_level: default_log_level(),
        }
    }
}

impl CoreConfig {
    /// Builds a config from a variable lookup, typically `std::env::var`.
    ///
    /// Unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            config = config.with_log_level(&level)?;
        }
        if let Some(raw) = lookup(ENV_STORAGE_QUOTA) {
            config = config.with_storage_quota(parse_quota(&raw)?);
        }
        if let Some(title) = lookup(ENV_NOTE_TITLE) {
            config = config.with_default_note_title(title)?;
        }
        Ok(config)
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Result<Self, ConfigError> {
        let passphrase = passphrase.into();
        if passphrase.trim().is_empty() {
            return Err(ConfigError::BlankPassphrase);
        }
        self.passphrase = passphrase;
        Ok(self)
    }

    pub fn with_default_note_title(
        mut self,
        title: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let title = title.into();
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::BlankNoteTitle);
        }
        self.default_note_title = trimmed.to_string();
        Ok(self)
    }

    pub fn with_storage_quota(mut self, quota_bytes: Option<usize>) -> Self {
        self.storage_quota_bytes = quota_bytes.filter(|bytes| *bytes > 0);
        self
    }

    pub fn with_log_level(mut self, level: &str) -> Result<Self, ConfigError> {
        self.log_level = normalize_level(level).map_err(ConfigError::InvalidLogLevel)?;
        Ok(self)
    }
}

/// Parses a quota value. `off`/`none` disable enforcement.
fn parse_quota(raw: &str) -> Result<Option<usize>, ConfigError> {
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "off" | "none" | "unlimited" => Ok(None),
        _ => match trimmed.parse::<usize>() {
            Ok(0) | Err(_) => Err(ConfigError::InvalidQuota(trimmed.to_string())),
            Ok(bytes) => Ok(Some(bytes)),
        },
    }
}
