//! Updater error types
//!
//! Errors raised by pipeline stages and the action facade. Stage errors
//! never cross the orchestrator boundary: they are logged, recorded in
//! the run's stage status, and swallowed.

use thiserror::Error;

/// Errors that can occur across the update pipeline
#[derive(Debug, Error)]
pub enum UpdaterError {
    /// Malformed action parameters or invalid call arguments
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport-level HTTP failure (connect, TLS, timeout)
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a retryable 5xx status
    #[error("error {status} from server: {message}")]
    Server { status: u16, message: String },

    /// Server answered with a non-retryable error status
    #[error("unexpected status {status} fetching '{url}'")]
    Status { status: u16, url: String },

    /// Downloaded content could not be decoded or parsed
    #[error("failed to decode content: {0}")]
    Decode(String),

    /// Filesystem failure while materializing content
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key-value store failure
    #[error(transparent)]
    Store(#[from] curator_store::StoreError),

    /// Duplicate topic registration
    #[error("topic already registered: '{0}'")]
    StateConflict(String),

    /// On-demand trigger for a topic nobody registered
    #[error("no endpoint registered for topic '{0}'")]
    UnknownTopic(String),

    /// Stop was requested while the stage was waiting to retry
    #[error("operation interrupted by stop request")]
    Interrupted,
}

impl UpdaterError {
    /// Create an invalid-argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Whether the downloader should retry after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Server { .. })
    }
}

impl From<curator_config::ConfigError> for UpdaterError {
    fn from(err: curator_config::ConfigError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}
