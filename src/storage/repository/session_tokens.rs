// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token repository.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Scope;

use super::super::{AuthDatabase, DbResult};

/// Table: token → serialized StoredSessionToken (JSON bytes).
pub(crate) const SESSION_TOKENS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("session_tokens");

/// A short-lived bearer token standing in for repeated signing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredSessionToken {
    /// High-entropy random token value, base64url.
    pub token: String,
    /// The identifier the token was issued to.
    pub identifier: String,
    /// Key sequence number at issue time; rotation invalidates the token.
    pub ksn_at_issue: u64,
    /// Granted scopes.
    pub scopes: Vec<Scope>,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// When the token stops validating.
    pub expires_at: DateTime<Utc>,
}

/// Repository for session tokens.
pub struct SessionTokenRepository<'a> {
    db: &'a AuthDatabase,
}

impl<'a> SessionTokenRepository<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    /// Persist a freshly issued token.
    pub fn insert(&self, token: &StoredSessionToken) -> DbResult<()> {
        let json = serde_json::to_vec(token)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSION_TOKENS)?;
            table.insert(token.token.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a token by its value.
    pub fn get(&self, token: &str) -> DbResult<Option<StoredSessionToken>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSION_TOKENS)?;
        match table.get(token)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Delete tokens whose expiry has passed. Returns the removed count.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> DbResult<usize> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(SESSION_TOKENS)?;

            let mut expired = Vec::new();
            for entry in table.iter()? {
                let entry = entry?;
                let token: StoredSessionToken = serde_json::from_slice(entry.1.value())?;
                if now > token.expires_at {
                    expired.push(entry.0.value().to_string());
                }
            }

            for token in &expired {
                table.remove(token.as_str())?;
            }
            expired.len()
        };
        write_txn.commit()?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn temp_db() -> (AuthDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = AuthDatabase::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn sample_token(value: &str, ttl_seconds: i64) -> StoredSessionToken {
        let now = Utc::now();
        StoredSessionToken {
            token: value.to_string(),
            identifier: "did:rel:alice".to_string(),
            ksn_at_issue: 0,
            scopes: vec![Scope::Receive],
            issued_at: now,
            expires_at: now + Duration::seconds(ttl_seconds),
        }
    }

    #[test]
    fn insert_and_get() {
        let (db, _dir) = temp_db();
        let repo = SessionTokenRepository::new(&db);

        let token = sample_token("tok-1", 60);
        repo.insert(&token).unwrap();
        assert_eq!(repo.get("tok-1").unwrap().unwrap(), token);
        assert!(repo.get("tok-missing").unwrap().is_none());
    }

    #[test]
    fn purge_removes_only_expired() {
        let (db, _dir) = temp_db();
        let repo = SessionTokenRepository::new(&db);

        repo.insert(&sample_token("tok-stale", -5)).unwrap();
        repo.insert(&sample_token("tok-fresh", 60)).unwrap();

        let removed = repo.purge_expired(Utc::now()).unwrap();
        assert_eq!(removed, 1);
        assert!(repo.get("tok-stale").unwrap().is_none());
        assert!(repo.get("tok-fresh").unwrap().is_some());
    }
}
