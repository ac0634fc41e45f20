//! Router error types

use thiserror::Error;

/// Errors surfaced by the router
#[derive(Debug, Error)]
pub enum RouterError {
    /// Message does not match the expected adapter shape
    #[error("malformed message: {0}")]
    Malformed(String),
}

impl RouterError {
    /// Create a malformed-message error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

/// Result type for router operations
pub type Result<T> = std::result::Result<T, RouterError>;
