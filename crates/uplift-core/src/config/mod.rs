//! Configuration management for Uplift.
//!
//! Configuration is stored as TOML in the platform config directory and
//! split into sections mirroring the crate's modules. Every field has a
//! default so a missing or partial file always loads.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upload transport settings
    pub transport: TransportConfig,
    /// Session behavior settings
    pub upload: UploadConfig,
}

/// Settings for the HTTP upload transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Endpoint URL files are posted to
    pub endpoint: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: crate::DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Settings for upload session behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// File extensions accepted for upload; empty accepts everything
    pub accept: Vec<String>,
    /// Start uploads immediately when files are added
    pub auto_start: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            accept: Vec::new(),
            auto_start: true,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// Returns defaults if no configuration file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create config directory: {e}"))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(&path, content)
            .map_err(|e| Error::ConfigError(format!("Failed to write config: {e}")))
    }

    /// Get the default configuration directory path.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "uplift", "Uplift")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the full path to the configuration file.
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.strip_suffix('s')
            .map(|secs| {
                secs.parse()
                    .map(Duration::from_secs)
                    .map_err(serde::de::Error::custom)
            })
            .or_else(|| {
                s.strip_suffix('m').map(|mins| {
                    mins.parse::<u64>()
                        .map(|m| Duration::from_secs(m * 60))
                        .map_err(serde::de::Error::custom)
                })
            })
            .unwrap_or_else(|| Err(serde::de::Error::custom("invalid duration format")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.transport.endpoint, crate::DEFAULT_ENDPOINT);
        assert_eq!(config.transport.timeout, Duration::from_secs(30));
        assert!(config.upload.accept.is_empty());
        assert!(config.upload.auto_start);
    }

    #[test]
    fn test_config_roundtrip() {
        let original = Config {
            transport: TransportConfig {
                endpoint: "https://store.example/api/file".to_string(),
                timeout: Duration::from_secs(120),
            },
            upload: UploadConfig {
                accept: vec!["pdf".to_string(), "png".to_string()],
                auto_start: false,
            },
        };

        let content = toml::to_string_pretty(&original).expect("serialize");
        let loaded: Config = toml::from_str(&content).expect("parse");

        assert_eq!(loaded.transport.endpoint, "https://store.example/api/file");
        assert_eq!(loaded.transport.timeout, Duration::from_secs(120));
        assert_eq!(loaded.upload.accept, vec!["pdf", "png"]);
        assert!(!loaded.upload.auto_start);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");

        assert!(
            toml_str.contains("[transport]"),
            "Should have [transport] section"
        );
        assert!(
            toml_str.contains("[upload]"),
            "Should have [upload] section"
        );
    }

    #[test]
    fn test_config_deserialization_partial() {
        let partial = r#"
            [transport]
            endpoint = "http://10.0.0.5:8000/files"
        "#;

        let config: Config = toml::from_str(partial).expect("parse");

        assert_eq!(config.transport.endpoint, "http://10.0.0.5:8000/files");
        // Everything else falls back to defaults.
        assert_eq!(config.transport.timeout, Duration::from_secs(30));
        assert!(config.upload.auto_start);
    }

    #[test]
    fn test_humantime_duration_serialization() {
        let config = Config {
            transport: TransportConfig {
                timeout: Duration::from_secs(90),
                ..TransportConfig::default()
            },
            ..Config::default()
        };

        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        assert!(toml_str.contains("timeout = \"90s\""));

        let minutes: Config =
            toml::from_str("[transport]\ntimeout = \"5m\"").expect("parse minutes");
        assert_eq!(minutes.transport.timeout, Duration::from_secs(300));
    }
}
