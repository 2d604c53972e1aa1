//! Configuration loading from file and environment variables.

use serde::Deserialize;
use thiserror::Error;

use crate::feed::FeedFormat;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Event feed settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where events come from and how they are decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// NDJSON file to read; stdin when unset.
    #[serde(default)]
    pub path: Option<String>,

    /// Line format of the feed.
    #[serde(default)]
    pub format: FeedFormat,

    /// Capacity of the channel between the reader and the ingest loop.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

/// What to print once the feed is drained.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Print the indented tree outline to stdout.
    #[serde(default = "default_outline")]
    pub outline: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "kommissar_index=trace,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_channel_capacity() -> usize {
    256
}

fn default_outline() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            path: None,
            format: FeedFormat::default(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            outline: default_outline(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override held a value that does not parse.
    #[error("invalid value {value:?} for {var}")]
    InvalidOverride {
        /// The environment variable.
        var: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `KOMMISSAR_FEED_PATH` overrides `feed.path`
/// - `KOMMISSAR_FEED_FORMAT` overrides `feed.format` (`watch` or `object`)
/// - `KOMMISSAR_LOG_LEVEL` overrides `logging.level`
/// - `KOMMISSAR_LOG_JSON` overrides `logging.json` ("true" or "1" enables)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if `KOMMISSAR_FEED_FORMAT` names an unknown format.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    if let Ok(feed_path) = std::env::var("KOMMISSAR_FEED_PATH") {
        if !feed_path.trim().is_empty() {
            config.feed.path = Some(feed_path);
        }
    }
    if let Ok(format) = std::env::var("KOMMISSAR_FEED_FORMAT") {
        config.feed.format = format
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidOverride {
                var: "KOMMISSAR_FEED_FORMAT",
                value: format.clone(),
            })?;
    }
    if let Ok(level) = std::env::var("KOMMISSAR_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("KOMMISSAR_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}
