// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization pattern repository.
//!
//! Patterns are regex exceptions to the tier gate, scoped to a tier and
//! evaluated in descending priority order. Regex validation happens in the
//! pattern engine before rows reach this repository; storage stays
//! mechanical.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::authz::Tier;

use super::super::{AuthDatabase, DbError, DbResult};

/// Table: pattern_id → serialized StoredAuthPattern (JSON bytes).
pub(crate) const AUTH_PATTERNS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("auth_patterns");

/// A regex exception to the tier gate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredAuthPattern {
    /// Unique pattern identifier (UUID).
    pub id: String,
    /// Regex matched against the recipient identifier.
    pub regex: String,
    /// Sender tier this exception applies to.
    pub applies_to_tier: Tier,
    /// Evaluation priority; higher runs first.
    pub priority: i32,
    /// Whether the pattern participates in evaluation.
    pub active: bool,
    /// Expiry after which the pattern stops matching.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Admin identifier that created the pattern.
    pub created_by: String,
    /// When the pattern was created.
    pub created_at: DateTime<Utc>,
}

/// Repository for authorization patterns.
pub struct AuthPatternRepository<'a> {
    db: &'a AuthDatabase,
}

impl<'a> AuthPatternRepository<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    /// Persist a pattern.
    pub fn insert(&self, pattern: &StoredAuthPattern) -> DbResult<()> {
        let json = serde_json::to_vec(pattern)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AUTH_PATTERNS)?;
            table.insert(pattern.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a pattern by id.
    pub fn get(&self, pattern_id: &str) -> DbResult<Option<StoredAuthPattern>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUTH_PATTERNS)?;
        match table.get(pattern_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Delete a pattern. Fails with `NotFound` when absent.
    pub fn remove(&self, pattern_id: &str) -> DbResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AUTH_PATTERNS)?;
            if table.remove(pattern_id)?.is_none() {
                return Err(DbError::NotFound(format!("pattern {pattern_id}")));
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// All patterns, unsorted.
    pub fn list_all(&self) -> DbResult<Vec<StoredAuthPattern>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUTH_PATTERNS)?;

        let mut patterns = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            patterns.push(serde_json::from_slice(entry.1.value())?);
        }
        Ok(patterns)
    }

    /// Patterns scoped to `tier`, sorted by descending priority.
    ///
    /// The pattern table is small; sorting in memory per evaluation keeps
    /// the storage layout trivial.
    pub fn list_for_tier(&self, tier: Tier) -> DbResult<Vec<StoredAuthPattern>> {
        let mut patterns: Vec<StoredAuthPattern> = self
            .list_all()?
            .into_iter()
            .filter(|p| p.applies_to_tier == tier)
            .collect();
        patterns.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(patterns)
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

    fn sample_pattern(id: &str, regex: &str, priority: i32) -> StoredAuthPattern {
        StoredAuthPattern {
            id: id.to_string(),
            regex: regex.to_string(),
            applies_to_tier: Tier::Unknown,
            priority,
            active: true,
            expires_at: None,
            created_by: "did:rel:root".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_get_remove() {
        let (db, _dir) = temp_db();
        let repo = AuthPatternRepository::new(&db);

        repo.insert(&sample_pattern("p-1", "^did:rel:support-.*$", 10))
            .unwrap();
        assert!(repo.get("p-1").unwrap().is_some());

        repo.remove("p-1").unwrap();
        assert!(repo.get("p-1").unwrap().is_none());
        assert!(matches!(repo.remove("p-1"), Err(DbError::NotFound(_))));
    }

    #[test]
    fn list_for_tier_sorts_by_descending_priority() {
        let (db, _dir) = temp_db();
        let repo = AuthPatternRepository::new(&db);

        repo.insert(&sample_pattern("p-low", "low", 1)).unwrap();
        repo.insert(&sample_pattern("p-high", "high", 100)).unwrap();
        repo.insert(&sample_pattern("p-mid", "mid", 50)).unwrap();

        let mut verified_scope = sample_pattern("p-other", "other", 999);
        verified_scope.applies_to_tier = Tier::Verified;
        repo.insert(&verified_scope).unwrap();

        let patterns = repo.list_for_tier(Tier::Unknown).unwrap();
        let ids: Vec<&str> = patterns.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p-high", "p-mid", "p-low"]);
    }
}
