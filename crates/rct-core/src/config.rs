//! Transformer configuration, read from TOML.
//!
//! ```toml
//! # Time units of history kept on every dynamic edge.
//! retention_window = 10000
//! ```
//!
//! | Variable | Field |
//! |---|---|
//! | `RCT_RETENTION_WINDOW` | `retention_window` |

use std::fs;
use std::path::Path;

use rct_types::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// History kept per dynamic edge when nothing else is configured.
pub const DEFAULT_RETENTION_WINDOW: Timestamp = 10_000;

/// Errors raised while loading or saving a [`TransformerConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("retention window must be greater than zero")]
    InvalidRetention,
}

/// Construction parameters of a [`TransformerCore`][crate::TransformerCore].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformerConfig {
    /// Samples older than `newest - retention_window` are evicted from
    /// dynamic edges.
    #[serde(default = "default_retention_window")]
    pub retention_window: Timestamp,
}

fn default_retention_window() -> Timestamp {
    DEFAULT_RETENTION_WINDOW
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            retention_window: default_retention_window(),
        }
    }
}

impl TransformerConfig {
    /// Parse and validate a TOML document.  Missing keys take their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `path`, then apply `RCT_*` environment overrides.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        let mut cfg: Self = toml::from_str(&raw)?;
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(Some(cfg))
    }

    /// Write as TOML, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retention_window == 0 {
            return Err(ConfigError::InvalidRetention);
        }
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides read through `lookup`; unparsable values are ignored.
    pub(crate) fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("RCT_RETENTION_WINDOW") {
            match v.trim().parse::<Timestamp>() {
                Ok(window) => self.retention_window = window,
                Err(e) => warn!(value = %v, error = %e, "ignoring invalid RCT_RETENTION_WINDOW"),
            }
        }
    }
}
