//! # Configuration
//!
//! `lorekeep.toml` settings for the binary.
//!
//! Precedence, lowest to highest: built-in defaults, the config file
//! (`--config <file>`, else `lorekeep.toml` in the working directory if
//! present), command-line flags.
//!
//! ```toml
//! [memory]
//! path = "docs/memory/process_memory.jsonl"
//!
//! [query]
//! related_depth = 1
//! network_depth = 2
//! summary_words = 150
//! ```

use lorekeep_core::{
    DEFAULT_LOG_FILE, DEFAULT_NETWORK_DEPTH, DEFAULT_RELATED_DEPTH, DEFAULT_SUMMARY_WORDS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "lorekeep.toml";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file '{path}': {reason}")]
    ReadFile { path: PathBuf, reason: String },

    #[error("Invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// =============================================================================
// CONFIG
// =============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub memory: MemoryConfig,
    pub query: QueryConfig,
}

/// Where the process memory log lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Path of the JSONL log.
    pub path: PathBuf,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

/// Defaults for query commands that take a depth or size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub related_depth: usize,
    pub network_depth: usize,
    /// Word budget for `summary`. Must be > 0.
    pub summary_words: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            related_depth: DEFAULT_RELATED_DEPTH,
            network_depth: DEFAULT_NETWORK_DEPTH,
            summary_words: DEFAULT_SUMMARY_WORDS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file, else `lorekeep.toml` if present, else defaults.
    ///
    /// An explicit path that cannot be read is an error; a missing default
    /// file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            tracing::debug!(path = %path.display(), "loading config");
            return Self::from_file(path);
        }

        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            tracing::debug!(path = %fallback.display(), "loading config");
            return Self::from_file(fallback);
        }

        tracing::debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.query.summary_words == 0 {
            return Err(ConfigError::Invalid(
                "query.summary_words must be > 0".to_string(),
            ));
        }
        if self.memory.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("memory.path must not be empty".to_string()));
        }
        Ok(())
    }
}
