//! Batch transactions
//!
//! A `Transaction` stages writes in memory and applies them atomically on
//! `commit()` through a single `WriteBatch` with the WAL disabled, followed
//! by a flush of the parent store's column families. Reads inside the
//! transaction observe its own staged writes before falling back to the
//! parent store. Dropping an uncommitted transaction discards every staged
//! operation.
//!
//! Concurrency control is optimistic: the parent value of every staged key
//! is captured when the key is first staged, and `commit()` re-reads those
//! keys and fails with `StateConflict` when a concurrent writer changed any
//! of them in the meantime. A conflicted commit applies nothing.

use std::collections::HashMap;

use rocksdb::{WriteBatch, WriteOptions};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::store::KvStore;

#[cfg(test)]
#[path = "transaction_test.rs"]
mod tests;

enum StagedOp {
    Put {
        column: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        column: String,
        key: Vec<u8>,
    },
}

/// In-flight transaction on a [`KvStore`]
///
/// Not shareable across threads; hold it on the thread that began it.
pub struct Transaction<'a> {
    store: &'a KvStore,
    ops: Vec<StagedOp>,
    // Read-your-writes overlay: `None` marks a staged delete.
    overlay: HashMap<(String, Vec<u8>), Option<Vec<u8>>>,
    // Parent value of each staged key as first observed, re-checked at
    // commit time for conflicts.
    baseline: HashMap<(String, Vec<u8>), Option<Vec<u8>>>,
    committed: bool,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(store: &'a KvStore) -> Self {
        Self {
            store,
            ops: Vec::new(),
            overlay: HashMap::new(),
            baseline: HashMap::new(),
            committed: false,
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.committed {
            return Err(StoreError::transaction_state(
                "transaction already committed",
            ));
        }
        Ok(())
    }

    fn check_target(&self, column: &str, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(StoreError::invalid_argument("key is empty"));
        }
        // Resolve the column now so a bad name fails at staging time, not
        // in the middle of the commit batch.
        self.store.cf(column).map(drop)
    }

    /// Record the parent value of a key the first time it is staged
    fn capture_baseline(&mut self, column: &str, key: &[u8]) -> Result<()> {
        let target = (column.to_string(), key.to_vec());
        if !self.baseline.contains_key(&target) {
            let current = self.store.get(column, key)?;
            self.baseline.insert(target, current);
        }
        Ok(())
    }

    /// Stage a put; visible to `get` on this transaction only
    pub fn put(&mut self, column: &str, key: &[u8], value: &[u8]) -> Result<()> {
        self.check_open()?;
        self.check_target(column, key)?;
        self.capture_baseline(column, key)?;
        self.ops.push(StagedOp::Put {
            column: column.to_string(),
            key: key.to_vec(),
            value: value.to_vec(),
        });
        self.overlay
            .insert((column.to_string(), key.to_vec()), Some(value.to_vec()));
        Ok(())
    }

    /// Stage a delete
    pub fn delete(&mut self, column: &str, key: &[u8]) -> Result<()> {
        self.check_open()?;
        self.check_target(column, key)?;
        self.capture_baseline(column, key)?;
        self.ops.push(StagedOp::Delete {
            column: column.to_string(),
            key: key.to_vec(),
        });
        self.overlay.insert((column.to_string(), key.to_vec()), None);
        Ok(())
    }

    /// Read a value, observing this transaction's staged writes first
    pub fn get(&self, column: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.check_target(column, key)?;
        if let Some(staged) = self.overlay.get(&(column.to_string(), key.to_vec())) {
            return Ok(staged.clone());
        }
        self.store.get(column, key)
    }

    /// Create a column family on the parent store
    ///
    /// Column creation is not transactional: it takes effect immediately
    /// and survives a rollback.
    pub fn create_column(&self, name: &str) -> Result<()> {
        self.store.create_column(name)
    }

    /// Whether a column family exists on the parent store
    pub fn column_exists(&self, name: &str) -> Result<bool> {
        self.store.column_exists(name)
    }

    /// Flushing is only permitted on the store itself
    pub fn flush(&self) -> Result<()> {
        Err(StoreError::transaction_state(
            "flush is not allowed inside a transaction",
        ))
    }

    /// Number of staged operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the transaction has no staged operations
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply every staged operation atomically
    ///
    /// Staged keys are validated against the parent store first: a key a
    /// concurrent writer changed since it was staged fails the whole
    /// commit with `StateConflict` and nothing is applied. On success the
    /// batch is written with the WAL disabled and the parent store's
    /// column families are flushed so the result is durable.
    pub fn commit(mut self) -> Result<()> {
        self.check_open()?;

        for ((column, key), expected) in &self.baseline {
            let current = self.store.get(column, key)?;
            if current != *expected {
                return Err(StoreError::StateConflict(format!(
                    "key '{}' in column '{}' was modified by a concurrent writer",
                    String::from_utf8_lossy(key),
                    column,
                )));
            }
        }

        let mut batch = WriteBatch::default();
        for op in &self.ops {
            match op {
                StagedOp::Put { column, key, value } => {
                    let cf = self.store.cf(column)?;
                    batch.put_cf(&cf, key, value);
                }
                StagedOp::Delete { column, key } => {
                    let cf = self.store.cf(column)?;
                    batch.delete_cf(&cf, key);
                }
            }
        }

        let mut opts = WriteOptions::default();
        opts.disable_wal(true);
        self.store.db.write_opt(batch, &opts)?;
        self.store.flush()?;

        self.committed = true;
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed && !self.ops.is_empty() {
            debug!(
                staged = self.ops.len(),
                "transaction dropped without commit, discarding staged operations"
            );
        }
    }
}
