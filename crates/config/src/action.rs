//! Action parameter document
//!
//! Each content feed is described by one JSON document passed to the
//! `Action` constructor. Field names follow the wire format
//! (`camelCase`); enums use their kebab-case wire spelling.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, Result};

#[cfg(test)]
#[path = "action_test.rs"]
mod tests;

/// Where the content comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentSource {
    /// Incremental catch-up against a CTI-style offset API
    CtiOffset,
    /// Full snapshot advertised by a CTI-style consumer endpoint
    CtiSnapshot,
    /// Local file copied into the workspace
    File,
    /// Plain HTTP endpoint serving the content body directly
    Api,
    /// No remote at all; content is already on disk
    Offline,
}

impl ContentSource {
    /// Wire spelling of the variant
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CtiOffset => "cti-offset",
            Self::CtiSnapshot => "cti-snapshot",
            Self::File => "file",
            Self::Api => "api",
            Self::Offline => "offline",
        }
    }
}

/// Compression applied to the downloaded body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    /// No compression; the body is materialized directly under `contents/`
    #[default]
    Raw,
    /// XZ stream; the body lands in `downloads/` and is decompressed
    Xz,
}

impl CompressionType {
    /// File extension for downloaded artifacts, without the dot
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Self::Raw => None,
            Self::Xz => Some("xz"),
        }
    }
}

/// Format of the decompressed content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    /// JSON, parsed and published item by item
    Json,
    /// XML, materialized but not parsed
    Xml,
    /// Opaque bytes
    #[default]
    Raw,
}

impl DataFormat {
    /// File extension for materialized content, without the dot
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Self::Json => Some("json"),
            Self::Xml => Some("xml"),
            Self::Raw => None,
        }
    }
}

/// Per-feed configuration, immutable for the Action lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigData {
    /// Fetch URL (or local path for `file`/`offline` sources)
    pub url: String,

    /// Where the content comes from
    pub content_source: ContentSource,

    /// Compression of the downloaded body
    /// Default: raw
    #[serde(default)]
    pub compression_type: CompressionType,

    /// Format of the materialized content
    /// Default: raw
    #[serde(default)]
    pub data_format: DataFormat,

    /// Remove `downloads/` artifacts once a run finishes
    /// Default: false
    #[serde(default)]
    pub delete_downloaded_content: bool,

    /// Work root; `downloads/` and `contents/` are created beneath it
    pub output_folder: PathBuf,

    /// Basename for materialized content files
    pub content_file_name: String,

    /// Key-value store location; omit to disable persistence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Consumer tag included in published messages
    pub consumer_name: String,
}

impl ConfigData {
    /// Validate field values
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() && self.content_source != ContentSource::Offline {
            return Err(ConfigError::invalid("url must not be empty"));
        }
        if self.output_folder.as_os_str().is_empty() {
            return Err(ConfigError::invalid("outputFolder must not be empty"));
        }
        if self.content_file_name.is_empty() {
            return Err(ConfigError::invalid("contentFileName must not be empty"));
        }
        if self.consumer_name.is_empty() {
            return Err(ConfigError::invalid("consumerName must not be empty"));
        }
        Ok(())
    }
}

/// Top-level action document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionParameters {
    /// Router topic and on-demand endpoint name
    pub topic_name: String,

    /// Seconds between scheduled runs
    /// Default: 0 (scheduling disabled until started explicitly)
    #[serde(default)]
    pub interval: u64,

    /// Register the on-demand endpoint at startup
    /// Default: false
    #[serde(default)]
    pub ondemand: bool,

    /// Feed configuration; absence is a constructor-time error, not a
    /// parse error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_data: Option<ConfigData>,
}

impl ActionParameters {
    /// Parse an action document from a JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Validate the document, requiring `configData`
    ///
    /// Returns the validated feed configuration.
    pub fn validate(&self) -> Result<&ConfigData> {
        if self.topic_name.is_empty() {
            return Err(ConfigError::invalid("topicName must not be empty"));
        }
        let config = self
            .config_data
            .as_ref()
            .ok_or(ConfigError::MissingConfigData)?;
        config.validate()?;
        Ok(config)
    }
}
