//! Runtime configuration read from the environment.
//!
//! # Invariants
//! - Missing variables fall back to defaults; blank values count as missing.
//! - Applying a config without a log directory leaves logging untouched.

use crate::logging::{default_log_level, init_logging, normalize_level};
use serde::Deserialize;
use std::path::PathBuf;

pub const ENV_LOG_LEVEL: &str = "WINRT_INTEROP_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "WINRT_INTEROP_LOG_DIR";

/// Settings a host process hands to the runtime at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl RuntimeConfig {
    /// Reads `WINRT_INTEROP_LOG_LEVEL` and `WINRT_INTEROP_LOG_DIR`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();
        if let Some(level) = present(ENV_LOG_LEVEL) {
            config.log_level = level.trim().to_string();
        }
        config.log_dir = present(ENV_LOG_DIR).map(|dir| PathBuf::from(dir.trim()));
        config
    }

    /// Starts file logging when a directory is configured.
    ///
    /// Returns whether logging was (or already is) active for this config.
    pub fn apply(&self) -> Result<bool, String> {
        let level = normalize_level(&self.log_level)?;
        let Some(dir) = &self.log_dir else {
            return Ok(false);
        };
        let dir = dir
            .to_str()
            .ok_or_else(|| format!("log_dir is not valid UTF-8: `{}`", dir.display()))?;
        init_logging(level, dir)?;
        Ok(true)
    }
}
