// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key state repository.
//!
//! An identifier's key state is an externally maintained record: the current
//! Ed25519 verification keys, the signing threshold and the key sequence
//! number (ksn). It is created once at registration and replaced wholesale on
//! rotation; rotation bumps the ksn by one inside the same write transaction,
//! which is what cuts over every outstanding proof and session token at once.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{AuthDatabase, DbError, DbResult};

/// Table: identifier → serialized StoredKeyState (JSON bytes).
pub(crate) const KEY_STATES: TableDefinition<&str, &[u8]> = TableDefinition::new("key_states");

/// Current key state for an identifier.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredKeyState {
    /// The identifier this state belongs to.
    pub identifier: String,
    /// Key sequence number; increments on each rotation.
    pub ksn: u64,
    /// Ordered Ed25519 verification keys, base64-encoded.
    pub keys: Vec<String>,
    /// Minimum number of valid signatures required.
    pub threshold: u32,
    /// Reference to the key event that produced this state (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event_ref: Option<String>,
    /// When this state was written.
    pub updated_at: DateTime<Utc>,
}

/// Repository for key states.
pub struct KeyStateRepository<'a> {
    db: &'a AuthDatabase,
}

impl<'a> KeyStateRepository<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    /// Look up the current key state for an identifier.
    pub fn get(&self, identifier: &str) -> DbResult<Option<StoredKeyState>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(KEY_STATES)?;
        match table.get(identifier)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Register a fresh identifier at ksn 0.
    pub fn register(
        &self,
        identifier: &str,
        keys: Vec<String>,
        threshold: u32,
        last_event_ref: Option<String>,
    ) -> DbResult<StoredKeyState> {
        let write_txn = self.db.begin_write()?;
        let state = {
            let mut table = write_txn.open_table(KEY_STATES)?;
            if table.get(identifier)?.is_some() {
                return Err(DbError::AlreadyExists(format!("key state {identifier}")));
            }
            let state = StoredKeyState {
                identifier: identifier.to_string(),
                ksn: 0,
                keys,
                threshold,
                last_event_ref,
                updated_at: Utc::now(),
            };
            let json = serde_json::to_vec(&state)?;
            table.insert(identifier, json.as_slice())?;
            state
        };
        write_txn.commit()?;
        Ok(state)
    }

    /// Replace the key state wholesale and advance the ksn by one.
    ///
    /// Atomic: the read of the old ksn and the write of the new state happen
    /// in a single write transaction, so a rotation racing in-flight proofs
    /// leaves no window where both key sets verify.
    pub fn rotate(
        &self,
        identifier: &str,
        keys: Vec<String>,
        threshold: u32,
        last_event_ref: Option<String>,
    ) -> DbResult<StoredKeyState> {
        let write_txn = self.db.begin_write()?;
        let state = {
            let mut table = write_txn.open_table(KEY_STATES)?;
            let current: StoredKeyState = {
                let existing = table
                    .get(identifier)?
                    .ok_or_else(|| DbError::NotFound(format!("key state {identifier}")))?;
                serde_json::from_slice(existing.value())?
            };

            let state = StoredKeyState {
                identifier: identifier.to_string(),
                ksn: current.ksn + 1,
                keys,
                threshold,
                last_event_ref,
                updated_at: Utc::now(),
            };
            let json = serde_json::to_vec(&state)?;
            table.insert(identifier, json.as_slice())?;
            state
        };
        write_txn.commit()?;
        Ok(state)
    }
}
