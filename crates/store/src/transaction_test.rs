//! Tests for batch transactions

use super::*;
use crate::store::DEFAULT_COLUMN;
use tempfile::TempDir;

fn open_store() -> (KvStore, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = KvStore::open(dir.path().join("db"), true).unwrap();
    (store, dir)
}

#[test]
fn test_staged_writes_invisible_until_commit() {
    let (store, _dir) = open_store();

    let mut txn = store.begin_transaction();
    txn.put(DEFAULT_COLUMN, b"key", b"value").unwrap();

    // Not observable through the parent store yet.
    assert_eq!(store.get(DEFAULT_COLUMN, b"key").unwrap(), None);

    txn.commit().unwrap();
    assert_eq!(
        store.get(DEFAULT_COLUMN, b"key").unwrap().as_deref(),
        Some(b"value".as_ref())
    );
}

#[test]
fn test_drop_without_commit_discards_writes() {
    let (store, _dir) = open_store();

    {
        let mut txn = store.begin_transaction();
        txn.put(DEFAULT_COLUMN, b"key", b"value").unwrap();
    }

    assert_eq!(store.get(DEFAULT_COLUMN, b"key").unwrap(), None);
}

#[test]
fn test_commit_is_atomic_across_columns() {
    let (store, _dir) = open_store();
    store.create_column("offsets").unwrap();

    let mut txn = store.begin_transaction();
    txn.put(DEFAULT_COLUMN, b"a", b"1").unwrap();
    txn.put("offsets", b"b", b"2").unwrap();
    txn.delete(DEFAULT_COLUMN, b"missing").unwrap();
    txn.commit().unwrap();

    assert_eq!(
        store.get(DEFAULT_COLUMN, b"a").unwrap().as_deref(),
        Some(b"1".as_ref())
    );
    assert_eq!(
        store.get("offsets", b"b").unwrap().as_deref(),
        Some(b"2".as_ref())
    );
}

#[test]
fn test_transaction_reads_its_own_writes() {
    let (store, _dir) = open_store();
    store.put(DEFAULT_COLUMN, b"key", b"old").unwrap();

    let mut txn = store.begin_transaction();
    assert_eq!(
        txn.get(DEFAULT_COLUMN, b"key").unwrap().as_deref(),
        Some(b"old".as_ref())
    );

    txn.put(DEFAULT_COLUMN, b"key", b"new").unwrap();
    assert_eq!(
        txn.get(DEFAULT_COLUMN, b"key").unwrap().as_deref(),
        Some(b"new".as_ref())
    );

    txn.delete(DEFAULT_COLUMN, b"key").unwrap();
    assert_eq!(txn.get(DEFAULT_COLUMN, b"key").unwrap(), None);

    // Parent store still sees the pre-transaction value.
    assert_eq!(
        store.get(DEFAULT_COLUMN, b"key").unwrap().as_deref(),
        Some(b"old".as_ref())
    );
}

#[test]
fn test_concurrent_write_to_staged_key_conflicts_commit() {
    let (store, _dir) = open_store();
    store.put(DEFAULT_COLUMN, b"key", b"old").unwrap();

    let mut txn = store.begin_transaction();
    txn.put(DEFAULT_COLUMN, b"key", b"staged").unwrap();

    // Another writer races in between staging and commit.
    store.put(DEFAULT_COLUMN, b"key", b"racer").unwrap();

    assert!(matches!(
        txn.commit(),
        Err(StoreError::StateConflict(_))
    ));

    // The conflicted commit applied nothing.
    assert_eq!(
        store.get(DEFAULT_COLUMN, b"key").unwrap().as_deref(),
        Some(b"racer".as_ref())
    );
}

#[test]
fn test_concurrent_delete_of_staged_key_conflicts_commit() {
    let (store, _dir) = open_store();
    store.put(DEFAULT_COLUMN, b"key", b"old").unwrap();

    let mut txn = store.begin_transaction();
    txn.delete(DEFAULT_COLUMN, b"key").unwrap();

    store.delete(DEFAULT_COLUMN, b"key").unwrap();

    assert!(matches!(
        txn.commit(),
        Err(StoreError::StateConflict(_))
    ));
}

#[test]
fn test_unrelated_concurrent_write_does_not_conflict() {
    let (store, _dir) = open_store();

    let mut txn = store.begin_transaction();
    txn.put(DEFAULT_COLUMN, b"mine", b"staged").unwrap();

    // Writes to keys the transaction never staged are not a conflict.
    store.put(DEFAULT_COLUMN, b"other", b"racer").unwrap();

    txn.commit().unwrap();
    assert_eq!(
        store.get(DEFAULT_COLUMN, b"mine").unwrap().as_deref(),
        Some(b"staged".as_ref())
    );
}

#[test]
fn test_flush_inside_transaction_is_rejected() {
    let (store, _dir) = open_store();

    let txn = store.begin_transaction();
    assert!(matches!(
        txn.flush(),
        Err(StoreError::TransactionState(_))
    ));
}

#[test]
fn test_empty_key_rejected_at_staging_time() {
    let (store, _dir) = open_store();

    let mut txn = store.begin_transaction();
    assert!(matches!(
        txn.put(DEFAULT_COLUMN, b"", b"value"),
        Err(StoreError::InvalidArgument(_))
    ));
    assert!(txn.is_empty());
}

#[test]
fn test_unknown_column_rejected_at_staging_time() {
    let (store, _dir) = open_store();

    let mut txn = store.begin_transaction();
    assert!(matches!(
        txn.put("missing", b"key", b"value"),
        Err(StoreError::UnknownColumn(_))
    ));
}

#[test]
fn test_column_creation_is_not_transactional() {
    let (store, _dir) = open_store();

    {
        let txn = store.begin_transaction();
        txn.create_column("offsets").unwrap();
        assert!(txn.column_exists("offsets").unwrap());
    }

    // The column survives the rollback.
    assert!(store.column_exists("offsets").unwrap());
}

#[test]
fn test_staged_op_count() {
    let (store, _dir) = open_store();

    let mut txn = store.begin_transaction();
    assert!(txn.is_empty());

    txn.put(DEFAULT_COLUMN, b"a", b"1").unwrap();
    txn.delete(DEFAULT_COLUMN, b"b").unwrap();
    assert_eq!(txn.len(), 2);
}
