//! Curator configuration
//!
//! Typed mirror of the action parameter document plus the daemon's TOML
//! config file. Minimal config should just work - only specify what you
//! need to change.
//!
//! # Action documents
//!
//! Each content feed is one JSON document (see [`ActionParameters`]):
//!
//! ```json
//! {
//!   "topicName": "threat-intel",
//!   "interval": 3600,
//!   "ondemand": true,
//!   "configData": {
//!     "url": "https://cti.example.com/api/v1/catalog/consumers",
//!     "contentSource": "cti-offset",
//!     "compressionType": "xz",
//!     "dataFormat": "json",
//!     "outputFolder": "/var/lib/curator/threat-intel",
//!     "contentFileName": "content.json",
//!     "databasePath": "/var/lib/curator/threat-intel/db",
//!     "consumerName": "vd_consumer"
//!   }
//! }
//! ```
//!
//! # Daemon file
//!
//! The daemon loads a TOML file with a `[log]` section and one
//! `[[action]]` table per feed, each table holding the same keys as the
//! JSON document.

mod action;
mod error;
mod logging;

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use action::{
    ActionParameters, CompressionType, ConfigData, ContentSource, DataFormat,
};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogLevel};

/// Daemon configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Logging configuration
    pub log: LogConfig,

    /// Content feeds, one action each
    #[serde(rename = "action")]
    pub actions: Vec<ActionParameters>,
}

impl DaemonConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_str(&contents)
    }

    /// Validate every action document
    pub fn validate(&self) -> Result<()> {
        for action in &self.actions {
            action.validate()?;
        }
        Ok(())
    }
}

impl FromStr for DaemonConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let config: DaemonConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = DaemonConfig::from_str("").unwrap();
        assert!(config.actions.is_empty());
        assert_eq!(config.log.level, LogLevel::Info);
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[log]
level = "debug"

[[action]]
topicName = "threat-intel"
interval = 60
ondemand = true

[action.configData]
url = "http://localhost:4444/xz/consumers"
contentSource = "cti-snapshot"
compressionType = "xz"
dataFormat = "json"
outputFolder = "/tmp/threat-intel"
contentFileName = "content.json"
consumerName = "vd_consumer"
"#;
        let config = DaemonConfig::from_str(toml).unwrap();

        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.actions.len(), 1);

        let action = &config.actions[0];
        assert_eq!(action.topic_name, "threat-intel");
        assert_eq!(action.interval, 60);
        assert_eq!(
            action.config_data.as_ref().unwrap().compression_type,
            CompressionType::Xz
        );
    }

    #[test]
    fn test_invalid_action_fails_validation() {
        let toml = r#"
[[action]]
topicName = "broken"
"#;
        assert!(DaemonConfig::from_str(toml).is_err());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(DaemonConfig::from_str("invalid { toml").is_err());
    }
}
