//! Logging configuration and bootstrap.
//!
//! The bus and store emit structured `tracing` events; this module configures
//! the subscriber once at application startup.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Configuration for the logging system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,

    /// Include file and line information
    #[serde(default)]
    pub include_file_info: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            include_file_info: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format for log aggregation systems
    Json,
    /// Human-readable format for development
    #[default]
    Pretty,
}

/// Initializes the global `tracing` subscriber from the given configuration.
///
/// Respects `RUST_LOG` when set; falls back to the configured level
/// otherwise. Returns an error if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info);

    match config.format {
        LogFormat::Json => builder.json().try_init()?,
        LogFormat::Pretty => builder.try_init()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(!config.include_file_info);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = LogConfig {
            level: "debug".to_string(),
            format: LogFormat::Json,
            include_file_info: true,
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: LogConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.level, "debug");
        assert_eq!(parsed.format, LogFormat::Json);
        assert!(parsed.include_file_info);
    }

    #[test]
    fn test_format_deserializes_lowercase() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
    }
}
