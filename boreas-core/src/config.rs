//! Configuration loading supporting YAML, TOML and JSON formats.
//!
//! Configuration structs live next to the components they configure; this
//! module provides the shared loading and layering machinery.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::ConfigError;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml)
    #[default]
    Yaml,
    /// TOML format (.toml)
    Toml,
    /// JSON format (.json)
    Json,
}

impl ConfigFormat {
    /// Detects the format from a file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "yaml" | "yml" => Some(Self::Yaml),
                "toml" => Some(Self::Toml),
                "json" => Some(Self::Json),
                _ => None,
            })
    }

    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

/// Configuration loader with support for multiple formats.
///
/// # Example
///
/// ```rust,ignore
/// use boreas_core::config::ConfigLoader;
///
/// let config: SystemConfig = ConfigLoader::new().load_file("boreas.yaml")?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Creates a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Loads configuration from a file.
    ///
    /// The format is automatically detected from the file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the format is not
    /// recognized, or the content cannot be parsed.
    pub fn load_file<T, P>(&self, path: P) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::InvalidFormat {
            path: path.display().to_string(),
            reason: "Unrecognized file extension. Supported: .yaml, .yml, .toml, .json".to_string(),
        })?;

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        self.load_str(&content, format)
    }

    /// Loads configuration from a string with the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be parsed.
    pub fn load_str<T>(&self, content: &str, format: ConfigFormat) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
    {
        let config: T = match format {
            ConfigFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidFormat {
                    path: "<string>".to_string(),
                    reason: format!("YAML parse error: {e}"),
                })?
            }
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| ConfigError::InvalidFormat {
                    path: "<string>".to_string(),
                    reason: format!("TOML parse error: {e}"),
                })?
            }
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| ConfigError::InvalidFormat {
                    path: "<string>".to_string(),
                    reason: format!("JSON parse error: {e}"),
                })?
            }
        };

        Ok(config)
    }
}

/// Merges two configurations, with the second taking precedence.
///
/// Useful for layered configuration (defaults + user config overlay).
#[must_use]
pub fn merge_configs<T>(base: T, overlay: T) -> T
where
    T: serde::Serialize + DeserializeOwned,
{
    let base_value = serde_json::to_value(&base).unwrap_or(serde_json::Value::Null);
    let overlay_value = serde_json::to_value(&overlay).unwrap_or(serde_json::Value::Null);

    let merged = merge_json_values(base_value, overlay_value);

    serde_json::from_value(merged).unwrap_or(base)
}

/// Recursively merges two JSON values.
fn merge_json_values(base: serde_json::Value, overlay: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged_val = if let Some(base_val) = base_map.remove(&key) {
                    merge_json_values(base_val, overlay_val)
                } else {
                    overlay_val
                };
                base_map.insert(key, merged_val);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
    struct TestConfig {
        name: String,
        #[serde(default)]
        workers: u32,
        #[serde(default)]
        verbose: bool,
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("boreas.yaml")),
            Some(ConfigFormat::Yaml)
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("boreas.yml")),
            Some(ConfigFormat::Yaml)
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("boreas.toml")),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("boreas.json")),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_path(Path::new("boreas.ini")), None);
        assert_eq!(ConfigFormat::from_path(Path::new("boreas")), None);
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(ConfigFormat::Yaml.extension(), "yaml");
        assert_eq!(ConfigFormat::Toml.extension(), "toml");
        assert_eq!(ConfigFormat::Json.extension(), "json");
    }

    #[test]
    fn test_load_yaml() {
        let yaml = r"
name: terminal
workers: 4
verbose: true
";
        let config: TestConfig = ConfigLoader::new().load_str(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.name, "terminal");
        assert_eq!(config.workers, 4);
        assert!(config.verbose);
    }

    #[test]
    fn test_load_toml() {
        let toml = r#"
name = "terminal"
workers = 2
"#;
        let config: TestConfig = ConfigLoader::new().load_str(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.name, "terminal");
        assert_eq!(config.workers, 2);
        assert!(!config.verbose);
    }

    #[test]
    fn test_load_json() {
        let json = r#"{"name": "terminal", "workers": 8}"#;
        let config: TestConfig = ConfigLoader::new().load_str(json, ConfigFormat::Json).unwrap();
        assert_eq!(config.workers, 8);
    }

    #[test]
    fn test_load_invalid_content() {
        let result: Result<TestConfig, _> =
            ConfigLoader::new().load_str("{not yaml: [", ConfigFormat::Yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_configs_overlay_wins() {
        let base = TestConfig {
            name: "base".to_string(),
            workers: 4,
            verbose: false,
        };
        let overlay = TestConfig {
            name: "overlay".to_string(),
            workers: 8,
            verbose: true,
        };

        let merged = merge_configs(base, overlay);
        assert_eq!(merged.name, "overlay");
        assert_eq!(merged.workers, 8);
        assert!(merged.verbose);
    }
}
