//! Configuration error types

use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The action document has no `configData` section
    #[error("missing configData")]
    MissingConfigData,

    /// A field value failed validation
    #[error("invalid configuration: {0}")]
    InvalidValue(String),

    /// Config file could not be read
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML
    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Action document does not match the expected shape
    #[error("failed to parse action parameters: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Create an invalid-value error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
