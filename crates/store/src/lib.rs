//! Embedded key-value store
//!
//! Wraps a RocksDB instance with column-family awareness, optional WAL,
//! prefix iteration, compaction, and batch transactions. The updater
//! pipeline uses it for offset bookkeeping; co-resident subsystems may
//! share the same instance through their own column families.
//!
//! # Design
//!
//! - **Column families**: every operation addresses a named column; the
//!   `DEFAULT_COLUMN` constant selects RocksDB's default family
//! - **Reopen-safe**: opening an existing database consults the manifest
//!   and reattaches *every* existing column family, not just the default
//! - **Two-channel reads**: a `get` miss is `Ok(None)`, never an error
//! - **Transactions**: writes staged in a `WriteBatch` and committed
//!   atomically with the WAL disabled; dropping an uncommitted
//!   transaction discards it
//!
//! # Example
//!
//! ```no_run
//! use curator_store::{KvStore, DEFAULT_COLUMN};
//!
//! let store = KvStore::open("/var/lib/curator/db", true).unwrap();
//! store.put(DEFAULT_COLUMN, b"current_offset", b"42").unwrap();
//! assert_eq!(
//!     store.get(DEFAULT_COLUMN, b"current_offset").unwrap().as_deref(),
//!     Some(b"42".as_ref()),
//! );
//! ```

mod error;
mod store;
mod transaction;

pub use error::{Result, StoreError};
pub use store::{KvStore, StoreIter, DEFAULT_COLUMN};
pub use transaction::Transaction;
