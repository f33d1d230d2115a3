//! Extraction configuration.
//!
//! Both binaries run on built-in defaults. A TOML file passed with
//! `--config` can override them; nothing is read implicitly.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};

/// Messages per output file.
pub const DEFAULT_CHUNK_SIZE: usize = 150;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Extraction and output settings.
    pub extract: ExtractConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Extraction and output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Number of messages written to each output file (default: 150).
    /// Changing it changes how many files a run produces.
    pub chunk_size: usize,
    /// Read buffer size in bytes (default: 1 MB).
    pub read_buffer_size: usize,
    /// Maximum message size in bytes (default: 256 MB). Longer messages are truncated.
    pub max_message_size: usize,
    /// Show a progress bar and a closing summary.
    pub progress: bool,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            read_buffer_size: 1024 * 1024,       // 1 MB
            max_message_size: 256 * 1024 * 1024, // 256 MB
            progress: true,
        }
    }
}

impl ExtractConfig {
    /// Reject settings the writer and parser cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ExtractError::InvalidChunkSize(self.chunk_size));
        }
        Ok(())
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration from an explicit path, or return the defaults.
///
/// Unlike a best-effort lookup, a file the user named must exist and parse.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(path).map_err(|e| ExtractError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let config: Config = toml::from_str(&contents).map_err(|e| ExtractError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    config.extract.validate().map_err(|e| ExtractError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    tracing::info!(path = %path.display(), "Loaded config");
    Ok(config)
}
