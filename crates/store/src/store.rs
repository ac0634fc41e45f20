//! RocksDB-backed store with column families
//!
//! Open semantics: the database directory is created if missing; when a
//! manifest already exists, the column families listed in it are all
//! reopened. Failing to enumerate them is fatal at construction time,
//! since opening with a partial set silently corrupts subsequent reads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rocksdb::{
    BottommostLevelCompaction, BoundColumnFamily, ColumnFamilyDescriptor, CompactOptions,
    DBIteratorWithThreadMode, DBWithThreadMode, Direction, FlushOptions, IteratorMode,
    MultiThreaded, Options, WriteBatch, WriteOptions,
};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::transaction::Transaction;

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

/// Name of RocksDB's default column family
pub const DEFAULT_COLUMN: &str = "default";

type Db = DBWithThreadMode<MultiThreaded>;

/// Column-family aware key-value store
///
/// Cloning is cheap: clones share the same underlying database handle.
/// Non-transactional operations are safe to call from multiple threads;
/// transactions must stay on the thread that created them.
#[derive(Clone)]
pub struct KvStore {
    pub(crate) db: Arc<Db>,
    columns: Arc<RwLock<Vec<String>>>,
    path: PathBuf,
    wal_enabled: bool,
}

fn db_options() -> Options {
    let mut opts = Options::default();
    opts.create_if_missing(true);
    opts.create_missing_column_families(true);
    opts
}

impl KvStore {
    /// Open (or create) a database at `path`
    ///
    /// When `wal_enabled` is false every write skips the write-ahead log;
    /// durability is then bounded by the last `flush()`.
    pub fn open<P: AsRef<Path>>(path: P, wal_enabled: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&path)?;

        let opts = db_options();

        // An existing manifest means previously created column families
        // must be reopened alongside the default one.
        let columns: Vec<String> = if path.join("CURRENT").exists() {
            Db::list_cf(&opts, &path)?
        } else {
            vec![DEFAULT_COLUMN.to_string()]
        };

        let descriptors = columns
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));
        let db = Db::open_cf_descriptors(&opts, &path, descriptors)?;

        debug!(path = %path.display(), columns = ?columns, "opened key-value store");

        Ok(Self {
            db: Arc::new(db),
            columns: Arc::new(RwLock::new(columns)),
            path,
            wal_enabled,
        })
    }

    /// Database directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn write_options(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.disable_wal(!self.wal_enabled);
        opts
    }

    pub(crate) fn cf(&self, column: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        if column.is_empty() {
            return Err(StoreError::invalid_argument("column name is empty"));
        }
        self.db
            .cf_handle(column)
            .ok_or_else(|| StoreError::UnknownColumn(column.to_string()))
    }

    fn check_key(key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(StoreError::invalid_argument("key is empty"));
        }
        Ok(())
    }

    /// Store a key-value pair, overwriting any previous value
    pub fn put(&self, column: &str, key: &[u8], value: &[u8]) -> Result<()> {
        Self::check_key(key)?;
        let cf = self.cf(column)?;
        self.db.put_cf_opt(&cf, key, value, &self.write_options())?;
        Ok(())
    }

    /// Fetch a value; `Ok(None)` means the key is absent
    pub fn get(&self, column: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Self::check_key(key)?;
        let cf = self.cf(column)?;
        Ok(self.db.get_cf(&cf, key)?)
    }

    /// Remove a key-value pair; removing an absent key is not an error
    pub fn delete(&self, column: &str, key: &[u8]) -> Result<()> {
        Self::check_key(key)?;
        let cf = self.cf(column)?;
        self.db.delete_cf_opt(&cf, key, &self.write_options())?;
        Ok(())
    }

    /// Create a new column family
    pub fn create_column(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(StoreError::invalid_argument("column name is empty"));
        }
        let mut columns = self.columns.write();
        if columns.iter().any(|c| c == name) {
            return Err(StoreError::DuplicateColumn(name.to_string()));
        }
        self.db.create_cf(name, &Options::default())?;
        columns.push(name.to_string());
        Ok(())
    }

    /// Whether a column family exists
    pub fn column_exists(&self, name: &str) -> Result<bool> {
        if name.is_empty() {
            return Err(StoreError::invalid_argument("column name is empty"));
        }
        Ok(self.db.cf_handle(name).is_some())
    }

    /// Names of all column families, including the default one
    pub fn columns(&self) -> Vec<String> {
        self.columns.read().clone()
    }

    /// Remove every key-value pair from every column family
    pub fn delete_all(&self) -> Result<()> {
        for column in self.columns() {
            let cf = self.cf(&column)?;
            let mut batch = WriteBatch::default();
            for entry in self.db.iterator_cf(&cf, IteratorMode::Start) {
                let (key, _) = entry?;
                batch.delete_cf(&cf, key);
            }
            let mut opts = WriteOptions::default();
            opts.disable_wal(true);
            self.db.write_opt(batch, &opts)?;
        }
        Ok(())
    }

    /// Flush memtables of every column family to disk
    pub fn flush(&self) -> Result<()> {
        let mut opts = FlushOptions::default();
        opts.set_wait(true);
        for column in self.columns() {
            let cf = self.cf(&column)?;
            self.db.flush_cf_opt(&cf, &opts)?;
        }
        Ok(())
    }

    /// Compact the whole key range of every column family
    pub fn compact(&self) -> Result<()> {
        for column in self.columns() {
            let cf = self.cf(&column)?;
            self.db
                .compact_range_cf(&cf, None::<&[u8]>, None::<&[u8]>);
        }
        Ok(())
    }

    /// Compact with bzip2 bottommost compression
    ///
    /// Switches the compression option to bzip2 and forces an optimized
    /// bottommost-level compaction, trading CPU for on-disk size.
    pub fn compact_bzip2(&self) -> Result<()> {
        self.db
            .set_options(&[("compression", "kBZip2Compression")])?;

        let mut opts = CompactOptions::default();
        opts.set_bottommost_level_compaction(BottommostLevelCompaction::ForceOptimized);
        for column in self.columns() {
            let cf = self.cf(&column)?;
            self.db
                .compact_range_cf_opt(&cf, None::<&[u8]>, None::<&[u8]>, &opts);
        }
        Ok(())
    }

    /// Last key-value pair of a column in key order
    pub fn last_key_value(&self, column: &str) -> Result<(Box<[u8]>, Box<[u8]>)> {
        let cf = self.cf(column)?;
        match self.db.iterator_cf(&cf, IteratorMode::End).next() {
            Some(entry) => Ok(entry?),
            None => Err(StoreError::NotFound),
        }
    }

    /// Iterate entries whose key starts with `prefix`, in key order
    pub fn seek<'a>(&'a self, column: &str, prefix: &[u8]) -> Result<StoreIter<'a>> {
        let cf = self.cf(column)?;
        let inner = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));
        Ok(StoreIter {
            inner,
            _cf: cf,
            prefix: Some(prefix.to_vec()),
        })
    }

    /// Iterate every entry of a column, in key order
    pub fn iter<'a>(&'a self, column: &str) -> Result<StoreIter<'a>> {
        let cf = self.cf(column)?;
        let inner = self.db.iterator_cf(&cf, IteratorMode::Start);
        Ok(StoreIter {
            inner,
            _cf: cf,
            prefix: None,
        })
    }

    /// Begin a transaction on this store
    ///
    /// Writes are staged and become visible only after `commit()`.
    pub fn begin_transaction(&self) -> Transaction<'_> {
        Transaction::new(self)
    }
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore")
            .field("path", &self.path)
            .field("columns", &self.columns())
            .field("wal_enabled", &self.wal_enabled)
            .finish()
    }
}

/// Iterator over store entries
///
/// Stops at the first engine error or, for prefix scans, at the first key
/// outside the prefix.
pub struct StoreIter<'a> {
    inner: DBIteratorWithThreadMode<'a, Db>,
    _cf: Arc<BoundColumnFamily<'a>>,
    prefix: Option<Vec<u8>>,
}

impl Iterator for StoreIter<'_> {
    type Item = (Box<[u8]>, Box<[u8]>);

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next() {
            Some(Ok((key, value))) => match &self.prefix {
                Some(prefix) if !key.starts_with(prefix) => None,
                _ => Some((key, value)),
            },
            _ => None,
        }
    }
}
