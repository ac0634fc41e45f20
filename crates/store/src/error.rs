//! Store error types

use thiserror::Error;

/// Errors surfaced by the key-value store
///
/// A `get` miss is *not* an error: it is reported as `Ok(None)` so callers
/// can distinguish absence from engine failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Empty key or column name
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Column family referenced before being created
    #[error("column family not found: '{0}'")]
    UnknownColumn(String),

    /// Column family created twice
    #[error("column family already exists: '{0}'")]
    DuplicateColumn(String),

    /// Requested entry does not exist (e.g. last key of an empty column)
    #[error("entry not found")]
    NotFound,

    /// Operation rejected in the current transaction state
    #[error("invalid transaction state: {0}")]
    TransactionState(String),

    /// Transaction commit lost the race against a concurrent writer
    #[error("transaction conflict: {0}")]
    StateConflict(String),

    /// Storage engine failure
    #[error("storage engine error: {0}")]
    Engine(#[from] rocksdb::Error),

    /// Filesystem failure while preparing the database directory
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Create an invalid-argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a transaction-state error
    pub fn transaction_state(msg: impl Into<String>) -> Self {
        Self::TransactionState(msg.into())
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
