//! Configuration file loading for game reviews.
//!
//! Settings live in `review.toml` in the current directory. Every field has
//! a default, so the file and each of its sections are optional.

use std::path::{Path, PathBuf};

use chess_analysis::{AnalysisConfig, EngineConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// No chess.com username was configured or given on the command line.
    #[error("No username configured; set `username` in review.toml or pass --user")]
    MissingUsername,
}

/// How the text report is laid out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReportStyle {
    /// Width of separator rules.
    #[serde(default = "default_width")]
    pub width: usize,
    /// Draw the board after each flagged move.
    #[serde(default = "default_true")]
    pub board_diagrams: bool,
    /// Draw pieces as Unicode chess symbols instead of letters.
    #[serde(default)]
    pub unicode_pieces: bool,
    /// List the evaluation of every position, not only the mistakes.
    #[serde(default = "default_true")]
    pub show_all_positions: bool,
}

fn default_width() -> usize {
    60
}

fn default_true() -> bool {
    true
}

impl Default for ReportStyle {
    fn default() -> Self {
        Self {
            width: default_width(),
            board_diagrams: true,
            unicode_pieces: false,
            show_all_positions: true,
        }
    }
}

/// Main review configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReviewConfig {
    /// chess.com account whose games are reviewed.
    #[serde(default)]
    pub username: Option<String>,
    /// Where downloaded monthly archives are kept.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub style: ReportStyle,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("saved_api_requests")
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            username: None,
            cache_dir: default_cache_dir(),
            engine: EngineConfig::default(),
            analysis: AnalysisConfig::default(),
            style: ReportStyle::default(),
        }
    }
}

impl ReviewConfig {
    /// Loads the configuration from `path`.
    ///
    /// If the file does not exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default path to the configuration file.
    pub fn config_path() -> PathBuf {
        PathBuf::from("review.toml")
    }

    /// The configured username.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingUsername`] if none is set.
    pub fn username(&self) -> Result<&str, ConfigError> {
        self.username
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or(ConfigError::MissingUsername)
    }
}
