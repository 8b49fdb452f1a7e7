// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded auth database backed by redb (pure Rust, ACID).
//!
//! A single [`AuthDatabase`] owns the redb [`Database`]. Entity access goes
//! through the repository types in [`super::repository`], each of which
//! borrows the database. Every atomic read-modify-write (challenge
//! consumption, rate increments, key rotation) runs inside one write
//! transaction; redb serializes those.

use std::path::Path;

use redb::{Database, ReadTransaction, ReadableDatabase, WriteTransaction};

use super::repository::{
    access_lists, audit, challenges, key_states, patterns, rate_limits, roles, session_tokens,
    tiers,
};

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DbError {
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

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// AuthDatabase
// =============================================================================

/// Embedded ACID database for the auth core.
pub struct AuthDatabase {
    db: Database,
}

impl AuthDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DbResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(key_states::KEY_STATES)?;
            let _ = write_txn.open_table(challenges::CHALLENGES)?;
            let _ = write_txn.open_table(tiers::TIERS)?;
            let _ = write_txn.open_table(roles::ADMIN_ROLES)?;
            let _ = write_txn.open_table(access_lists::ALLOW_LIST)?;
            let _ = write_txn.open_table(access_lists::DENY_LIST)?;
            let _ = write_txn.open_table(patterns::AUTH_PATTERNS)?;
            let _ = write_txn.open_table(rate_limits::RATE_COUNTERS)?;
            let _ = write_txn.open_table(rate_limits::RATE_OVERRIDES)?;
            let _ = write_txn.open_table(session_tokens::SESSION_TOKENS)?;
            let _ = write_txn.open_table(audit::AUDIT_LOG)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Begin a read transaction.
    pub(crate) fn begin_read(&self) -> DbResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction. Write transactions are serialized by redb.
    pub(crate) fn begin_write(&self) -> DbResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_pre_creates_tables() {
        let dir = tempfile::tempdir().unwrap();
        let db = AuthDatabase::open(&dir.path().join("auth.redb")).unwrap();

        // A read transaction over any table must succeed on a fresh database.
        let read_txn = db.begin_read().unwrap();
        let table = read_txn.open_table(challenges::CHALLENGES).unwrap();
        assert!(redb::ReadableTable::get(&table, "missing").unwrap().is_none());
    }

    #[test]
    fn reopen_existing_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.redb");
        {
            let _db = AuthDatabase::open(&path).unwrap();
        }
        let _db = AuthDatabase::open(&path).unwrap();
    }
}
