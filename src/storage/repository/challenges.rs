// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Challenge repository.
//!
//! Challenges are single-use: [`ChallengeRepository::try_consume`] performs
//! the check-and-mark inside one write transaction, so N concurrent
//! submissions of the same proof yield exactly one winner. Expired rows are
//! removed opportunistically via [`ChallengeRepository::purge_expired`].

use chrono::{DateTime, Utc};
use redb::{ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Purpose;

use super::super::{AuthDatabase, DbResult};

/// Table: challenge_id → serialized StoredChallenge (JSON bytes).
pub(crate) const CHALLENGES: TableDefinition<&str, &[u8]> = TableDefinition::new("challenges");

/// A persisted challenge awaiting its signed proof.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredChallenge {
    /// Unique challenge identifier (UUID).
    pub id: String,
    /// The identifier expected to sign this challenge.
    pub identifier: String,
    /// The operation this challenge authorizes.
    pub purpose: Purpose,
    /// Hex SHA-256 of the canonicalized operation arguments.
    pub args_hash: String,
    /// Random nonce included in the signed payload, base64.
    pub nonce: String,
    /// When the challenge was issued.
    pub issued_at: DateTime<Utc>,
    /// When the challenge stops being acceptable.
    pub expires_at: DateTime<Utc>,
    /// Whether a proof referencing this challenge has already succeeded.
    pub consumed: bool,
}

/// Result of an atomic consumption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// This caller won: the challenge is now marked consumed.
    Consumed,
    /// A concurrent (or earlier) proof already consumed the challenge.
    AlreadyUsed,
    /// No such challenge.
    NotFound,
}

/// Repository for challenges.
pub struct ChallengeRepository<'a> {
    db: &'a AuthDatabase,
}

impl<'a> ChallengeRepository<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    /// Persist a freshly issued challenge.
    pub fn insert(&self, challenge: &StoredChallenge) -> DbResult<()> {
        let json = serde_json::to_vec(challenge)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CHALLENGES)?;
            table.insert(challenge.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a challenge by id.
    pub fn get(&self, challenge_id: &str) -> DbResult<Option<StoredChallenge>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CHALLENGES)?;
        match table.get(challenge_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Atomically mark a challenge consumed.
    ///
    /// The read of the `consumed` flag and the write-back happen in a single
    /// write transaction; redb serializes write transactions, so concurrent
    /// duplicate submissions see exactly one [`ConsumeOutcome::Consumed`].
    pub fn try_consume(&self, challenge_id: &str) -> DbResult<ConsumeOutcome> {
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut table = write_txn.open_table(CHALLENGES)?;

            let existing_bytes = match table.get(challenge_id)? {
                Some(value) => value.value().to_vec(),
                None => return Ok(ConsumeOutcome::NotFound),
            };

            let mut challenge: StoredChallenge = serde_json::from_slice(&existing_bytes)?;
            if challenge.consumed {
                ConsumeOutcome::AlreadyUsed
            } else {
                challenge.consumed = true;
                let json = serde_json::to_vec(&challenge)?;
                table.insert(challenge_id, json.as_slice())?;
                ConsumeOutcome::Consumed
            }
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    /// Delete challenges whose expiry has passed. Returns the removed count.
    ///
    /// Cleanup is opportunistic and order-independent; callers invoke it on
    /// the issue path and never block on it.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> DbResult<usize> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(CHALLENGES)?;

            let mut expired = Vec::new();
            for entry in table.iter()? {
                let entry = entry?;
                let challenge: StoredChallenge = serde_json::from_slice(entry.1.value())?;
                if now > challenge.expires_at {
                    expired.push(entry.0.value().to_string());
                }
            }

            for id in &expired {
                table.remove(id.as_str())?;
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

    fn sample_challenge(id: &str) -> StoredChallenge {
        let now = Utc::now();
        StoredChallenge {
            id: id.to_string(),
            identifier: "did:rel:alice".to_string(),
            purpose: Purpose::Send,
            args_hash: "ab".repeat(32),
            nonce: "bm9uY2Utbm9uY2UtMTY=".to_string(),
            issued_at: now,
            expires_at: now + Duration::seconds(120),
            consumed: false,
        }
    }

    #[test]
    fn insert_and_get() {
        let (db, _dir) = temp_db();
        let repo = ChallengeRepository::new(&db);

        let challenge = sample_challenge("ch-1");
        repo.insert(&challenge).unwrap();

        let loaded = repo.get("ch-1").unwrap().unwrap();
        assert_eq!(loaded, challenge);
        assert!(repo.get("ch-missing").unwrap().is_none());
    }

    #[test]
    fn consume_is_single_use() {
        let (db, _dir) = temp_db();
        let repo = ChallengeRepository::new(&db);
        repo.insert(&sample_challenge("ch-once")).unwrap();

        assert_eq!(
            repo.try_consume("ch-once").unwrap(),
            ConsumeOutcome::Consumed
        );
        assert_eq!(
            repo.try_consume("ch-once").unwrap(),
            ConsumeOutcome::AlreadyUsed
        );
        assert_eq!(
            repo.try_consume("ch-nope").unwrap(),
            ConsumeOutcome::NotFound
        );
    }

    #[test]
    fn concurrent_consume_has_one_winner() {
        let (db, _dir) = temp_db();
        let repo = ChallengeRepository::new(&db);
        repo.insert(&sample_challenge("ch-race")).unwrap();

        let db = std::sync::Arc::new(db);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            handles.push(std::thread::spawn(move || {
                let repo = ChallengeRepository::new(&db);
                repo.try_consume("ch-race").unwrap()
            }));
        }

        let outcomes: Vec<ConsumeOutcome> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = outcomes
            .iter()
            .filter(|o| **o == ConsumeOutcome::Consumed)
            .count();
        assert_eq!(winners, 1, "exactly one submission may win");
        assert_eq!(
            outcomes.len() - winners,
            outcomes
                .iter()
                .filter(|o| **o == ConsumeOutcome::AlreadyUsed)
                .count()
        );
    }

    #[test]
    fn purge_removes_only_expired() {
        let (db, _dir) = temp_db();
        let repo = ChallengeRepository::new(&db);

        let mut stale = sample_challenge("ch-stale");
        stale.expires_at = Utc::now() - Duration::seconds(1);
        repo.insert(&stale).unwrap();
        repo.insert(&sample_challenge("ch-fresh")).unwrap();

        let removed = repo.purge_expired(Utc::now()).unwrap();
        assert_eq!(removed, 1);
        assert!(repo.get("ch-stale").unwrap().is_none());
        assert!(repo.get("ch-fresh").unwrap().is_some());
    }
}
