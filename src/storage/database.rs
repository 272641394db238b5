// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded card and credential database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized StoredUser
//! - `username_index`: username → user_id
//! - `email_index`: normalised email → user_id
//! - `cards`: card_id → serialized StoredCard
//! - `card_number_index`: encrypted card number → card_id
//! - `owner_cards`: (owner_id, card_id) → () for owner-scoped range scans
//! - `sequences`: sequence name → last issued id
//!
//! ## Isolation
//!
//! redb allows a single write transaction at a time. Every read-modify-write
//! reads its rows inside the write transaction, so concurrent balance updates
//! are serialized and cannot lose an update.

use std::fmt;
use std::path::Path;

use redb::{ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: user_id → serialized StoredUser (JSON bytes).
pub(crate) const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

/// Unique index: username → user_id.
pub(crate) const USERNAME_INDEX: TableDefinition<&str, u64> = TableDefinition::new("username_index");

/// Unique index: normalised email → user_id.
pub(crate) const EMAIL_INDEX: TableDefinition<&str, u64> = TableDefinition::new("email_index");

/// Primary table: card_id → serialized StoredCard (JSON bytes).
pub(crate) const CARDS: TableDefinition<u64, &[u8]> = TableDefinition::new("cards");

/// Unique index: encrypted card number → card_id.
///
/// Works only because card-number encryption is deterministic.
pub(crate) const CARD_NUMBER_INDEX: TableDefinition<&str, u64> =
    TableDefinition::new("card_number_index");

/// Index: (owner_id, card_id) → (). Range scans return an owner's cards in id order.
pub(crate) const OWNER_CARDS: TableDefinition<(u64, u64), ()> = TableDefinition::new("owner_cards");

/// Sequences: name → last issued id.
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

// =============================================================================
// Error Type
// =============================================================================

/// Unique constraints enforced by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    Username,
    Email,
    CardNumber,
}

impl fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueKey::Username => write!(f, "username"),
            UniqueKey::Email => write!(f, "email"),
            UniqueKey::CardNumber => write!(f, "card number"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unique constraint violated: {0}")]
    Conflict(UniqueKey),

    #[error("row {0} referenced twice in a single update")]
    DuplicateRow(u64),
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Database
// =============================================================================

/// Embedded ACID database holding users and cards.
pub struct Database {
    db: redb::Database,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = redb::Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERNAME_INDEX)?;
            let _ = write_txn.open_table(EMAIL_INDEX)?;
            let _ = write_txn.open_table(CARDS)?;
            let _ = write_txn.open_table(CARD_NUMBER_INDEX)?;
            let _ = write_txn.open_table(OWNER_CARDS)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub(crate) fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    pub(crate) fn begin_read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    /// Verify the database can serve a read transaction.
    pub fn health_check(&self) -> StorageResult<()> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SEQUENCES)?;
        let _ = table.get("users")?;
        Ok(())
    }
}

/// Issue the next id of a named sequence inside an open write transaction.
pub(crate) fn next_id(write_txn: &WriteTransaction, sequence: &str) -> StorageResult<u64> {
    let mut table = write_txn.open_table(SEQUENCES)?;
    let current = table.get(sequence)?.map(|v| v.value()).unwrap_or(0);
    let next = current + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

/// Read and deserialize a JSON row keyed by id.
pub(crate) fn read_row<T, R>(table: &R, id: u64) -> StorageResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<u64, &'static [u8]>,
{
    match table.get(id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

#[cfg(test)]
pub(crate) fn temp_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("test.redb")).unwrap();
    (db, dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("cards.redb");
        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        db.health_check().unwrap();
    }

    #[test]
    fn sequences_are_monotonic_and_independent() {
        let (db, _dir) = temp_db();

        let write_txn = db.begin_write().unwrap();
        assert_eq!(next_id(&write_txn, "cards").unwrap(), 1);
        assert_eq!(next_id(&write_txn, "cards").unwrap(), 2);
        assert_eq!(next_id(&write_txn, "users").unwrap(), 1);
        write_txn.commit().unwrap();

        let write_txn = db.begin_write().unwrap();
        assert_eq!(next_id(&write_txn, "cards").unwrap(), 3);
        write_txn.commit().unwrap();
    }

    #[test]
    fn aborted_transaction_does_not_advance_sequence() {
        let (db, _dir) = temp_db();

        let write_txn = db.begin_write().unwrap();
        assert_eq!(next_id(&write_txn, "cards").unwrap(), 1);
        write_txn.abort().unwrap();

        let write_txn = db.begin_write().unwrap();
        assert_eq!(next_id(&write_txn, "cards").unwrap(), 1);
        write_txn.commit().unwrap();
    }

    #[test]
    fn unique_key_display() {
        assert_eq!(UniqueKey::Username.to_string(), "username");
        assert_eq!(UniqueKey::CardNumber.to_string(), "card number");
        assert_eq!(
            StorageError::Conflict(UniqueKey::Email).to_string(),
            "unique constraint violated: email"
        );
    }
}
