// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tier record repository.
//!
//! The "absent means unknown" rule lives here, in [`TierRepository::tier_of`],
//! and nowhere else. Tier transitions are strictly upward; the check runs
//! inside the write transaction so concurrent assignments cannot demote an
//! identifier through write skew.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::authz::Tier;

use super::super::{AuthDatabase, DbResult};

/// Table: identifier → serialized StoredTierRecord (JSON bytes).
pub(crate) const TIERS: TableDefinition<&str, &[u8]> = TableDefinition::new("tiers");

/// A tier assignment with its audit fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredTierRecord {
    /// The identifier holding the tier.
    pub identifier: String,
    /// Assigned trust tier.
    pub tier: Tier,
    /// Admin identifier that performed the assignment.
    pub assigned_by: String,
    /// Challenge id of the proof that authorized the assignment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_ref: Option<String>,
    /// When the first tier record was created.
    pub created_at: DateTime<Utc>,
    /// When the tier last changed.
    pub updated_at: DateTime<Utc>,
}

/// Result of an atomic tier assignment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignOutcome {
    /// The tier was raised.
    Assigned(StoredTierRecord),
    /// The target tier was not strictly above the current one.
    NotAbove(Tier),
}

/// Repository for tier records.
pub struct TierRepository<'a> {
    db: &'a AuthDatabase,
}

impl<'a> TierRepository<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    /// Look up the tier record for an identifier, if any.
    pub fn get(&self, identifier: &str) -> DbResult<Option<StoredTierRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TIERS)?;
        match table.get(identifier)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Effective tier for an identifier. Absence of a record means
    /// [`Tier::Unknown`].
    pub fn tier_of(&self, identifier: &str) -> DbResult<Tier> {
        Ok(self.get(identifier)?.map(|r| r.tier).unwrap_or_default())
    }

    /// Atomically assign a strictly higher tier.
    ///
    /// Returns [`AssignOutcome::NotAbove`] with the current tier when the
    /// target is equal or lower; tiers never move down.
    pub fn assign(
        &self,
        identifier: &str,
        tier: Tier,
        assigned_by: &str,
        proof_ref: Option<String>,
    ) -> DbResult<AssignOutcome> {
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut table = write_txn.open_table(TIERS)?;

            let current: Option<StoredTierRecord> = match table.get(identifier)? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };

            let current_tier = current.as_ref().map(|r| r.tier).unwrap_or_default();
            if tier <= current_tier {
                AssignOutcome::NotAbove(current_tier)
            } else {
                let now = Utc::now();
                let record = StoredTierRecord {
                    identifier: identifier.to_string(),
                    tier,
                    assigned_by: assigned_by.to_string(),
                    proof_ref,
                    created_at: current.map(|r| r.created_at).unwrap_or(now),
                    updated_at: now,
                };
                let json = serde_json::to_vec(&record)?;
                table.insert(identifier, json.as_slice())?;
                AssignOutcome::Assigned(record)
            }
        };
        write_txn.commit()?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (AuthDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = AuthDatabase::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    #[test]
    fn absent_record_is_unknown() {
        let (db, _dir) = temp_db();
        let repo = TierRepository::new(&db);
        assert_eq!(repo.tier_of("did:rel:nobody").unwrap(), Tier::Unknown);
        assert!(repo.get("did:rel:nobody").unwrap().is_none());
    }

    #[test]
    fn assign_moves_upward() {
        let (db, _dir) = temp_db();
        let repo = TierRepository::new(&db);

        let outcome = repo
            .assign(
                "did:rel:alice",
                Tier::Known,
                "did:rel:admin",
                Some("ch-1".into()),
            )
            .unwrap();
        let AssignOutcome::Assigned(record) = outcome else {
            panic!("expected assignment");
        };
        assert_eq!(record.tier, Tier::Known);
        assert_eq!(repo.tier_of("did:rel:alice").unwrap(), Tier::Known);

        let outcome = repo
            .assign("did:rel:alice", Tier::Verified, "did:rel:admin", None)
            .unwrap();
        let AssignOutcome::Assigned(record) = outcome else {
            panic!("expected assignment");
        };
        assert_eq!(record.tier, Tier::Verified);
        // First assignment timestamp survives upgrades
        assert_eq!(
            record.created_at,
            repo.get("did:rel:alice").unwrap().unwrap().created_at
        );
    }

    #[test]
    fn assign_same_or_lower_tier_is_rejected() {
        let (db, _dir) = temp_db();
        let repo = TierRepository::new(&db);

        repo.assign("did:rel:alice", Tier::Verified, "did:rel:admin", None)
            .unwrap();

        let same = repo
            .assign("did:rel:alice", Tier::Verified, "did:rel:admin", None)
            .unwrap();
        assert_eq!(same, AssignOutcome::NotAbove(Tier::Verified));

        let lower = repo
            .assign("did:rel:alice", Tier::Known, "did:rel:admin", None)
            .unwrap();
        assert_eq!(lower, AssignOutcome::NotAbove(Tier::Verified));
        assert_eq!(repo.tier_of("did:rel:alice").unwrap(), Tier::Verified);
    }
}
