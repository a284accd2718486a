//! Configuration for the ThinkGear reader.
//!
//! Values come from `config.json` in the user's config directory when it
//! exists; command-line flags override individual fields.

use crate::driver::{BaudRate, DataType, NativeDriver, StreamFormat};
use crate::session::ConnectSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Driver bundle, resolved against the working directory
    pub bundle_path: PathBuf,

    /// Serial baud rate passed to connect
    pub baud: BaudRate,

    /// Stream format passed to connect
    pub stream_format: StreamFormat,

    /// Sleep between polls
    #[serde(with = "duration_millis", rename = "poll_interval_ms")]
    pub poll_interval: Duration,

    /// Channels written on the output line, in order
    pub channels: Vec<DataType>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bundle_path: NativeDriver::default_bundle_path(),
            baud: BaudRate::default(),
            stream_format: StreamFormat::default(),
            poll_interval: Duration::from_millis(500),
            channels: DataType::DEFAULT_CHANNELS.to_vec(),
        }
    }
}

impl Config {
    /// Load from the default location, or defaults if there is no file.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from an explicit file, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Default configuration file location.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("thinkgear-reader")
            .join("config.json")
    }

    /// Reject values the poll loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.channels.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one channel must be configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Connect parameters for `port`.
    pub fn connect_settings(&self, port: &str) -> ConnectSettings {
        ConnectSettings {
            port: port.to_string(),
            baud: self.baud,
            stream_format: self.stream_format,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration as whole milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join("thinkgear-reader-config-test")
            .join(format!("{}-{name}", std::process::id()))
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.baud, BaudRate::B9600);
        assert_eq!(config.stream_format, StreamFormat::Packets);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.channels, DataType::DEFAULT_CHANNELS.to_vec());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = scratch_file("partial.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{ "baud": 57600, "poll_interval_ms": 250, "channels": ["attention"] }"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.baud, BaudRate::B57600);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.channels, vec![DataType::Attention]);
        assert_eq!(config.stream_format, StreamFormat::Packets);
        assert_eq!(config.bundle_path, NativeDriver::default_bundle_path());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let path = scratch_file("invalid.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        std::fs::write(&path, r#"{ "poll_interval_ms": 0 }"#).unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Invalid(_))
        ));

        std::fs::write(&path, r#"{ "baud": 1000 }"#).unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let path = scratch_file("does-not-exist.json");
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_connect_settings() {
        let config = Config {
            baud: BaudRate::B115200,
            ..Config::default()
        };
        let settings = config.connect_settings("/dev/ttyUSB0");
        assert_eq!(settings.port, "/dev/ttyUSB0");
        assert_eq!(settings.baud, BaudRate::B115200);
        assert_eq!(settings.stream_format, StreamFormat::Packets);
    }
}
