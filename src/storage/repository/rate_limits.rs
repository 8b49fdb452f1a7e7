// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rate-limit counter repository.
//!
//! Fixed sliding window per identifier. The check-then-increment runs in one
//! write transaction so two concurrent requests cannot both pass the check
//! before either writes; the read-only peek path has zero side effects.

use redb::{ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{AuthDatabase, DbResult};

/// Table: identifier → serialized StoredRateCounter (JSON bytes).
pub(crate) const RATE_COUNTERS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("rate_counters");

/// Table: identifier → serialized StoredRateOverride (JSON bytes).
pub(crate) const RATE_OVERRIDES: TableDefinition<&str, &[u8]> =
    TableDefinition::new("rate_overrides");

/// A sliding-window counter.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredRateCounter {
    /// The identifier being counted.
    pub identifier: String,
    /// Window start, epoch milliseconds.
    pub window_start_ms: i64,
    /// Window length in milliseconds.
    pub window_ms: i64,
    /// Sends recorded in the current window.
    pub count: u32,
    /// Limit in force when the window was opened.
    pub limit: u32,
}

/// A per-identifier quota override replacing the tier default.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredRateOverride {
    /// The identifier the override applies to.
    pub identifier: String,
    /// Sends permitted per window.
    pub limit: u32,
    /// Window length in milliseconds.
    pub window_ms: i64,
}

/// Repository for rate-limit counters and overrides.
pub struct RateLimitRepository<'a> {
    db: &'a AuthDatabase,
}

impl<'a> RateLimitRepository<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    /// Atomic increment-or-reset. Returns `true` when the send is within
    /// limits (and has been counted), `false` when the quota is exhausted
    /// (nothing written).
    pub fn check_and_increment(
        &self,
        identifier: &str,
        limit: u32,
        window_ms: i64,
        now_ms: i64,
    ) -> DbResult<bool> {
        let write_txn = self.db.begin_write()?;
        let allowed = {
            let mut table = write_txn.open_table(RATE_COUNTERS)?;

            let existing: Option<StoredRateCounter> = match table.get(identifier)? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };

            let counter = match existing {
                Some(counter) if now_ms - counter.window_start_ms <= counter.window_ms => {
                    if counter.count >= limit {
                        None
                    } else {
                        Some(StoredRateCounter {
                            count: counter.count + 1,
                            ..counter
                        })
                    }
                }
                // Missing or stale window: open a fresh one at count 1
                _ => Some(StoredRateCounter {
                    identifier: identifier.to_string(),
                    window_start_ms: now_ms,
                    window_ms,
                    count: 1,
                    limit,
                }),
            };

            match counter {
                Some(counter) => {
                    let json = serde_json::to_vec(&counter)?;
                    table.insert(identifier, json.as_slice())?;
                    true
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(allowed)
    }

    /// Read-only quota check. Never writes.
    pub fn peek(
        &self,
        identifier: &str,
        limit: u32,
        _window_ms: i64,
        now_ms: i64,
    ) -> DbResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RATE_COUNTERS)?;

        match table.get(identifier)? {
            Some(value) => {
                let counter: StoredRateCounter = serde_json::from_slice(value.value())?;
                if now_ms - counter.window_start_ms > counter.window_ms {
                    // Stale window would reset on the next increment
                    Ok(true)
                } else {
                    Ok(counter.count < limit)
                }
            }
            None => Ok(true),
        }
    }

    /// Current counter, if one exists.
    pub fn get(&self, identifier: &str) -> DbResult<Option<StoredRateCounter>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RATE_COUNTERS)?;
        match table.get(identifier)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Quota override for an identifier, if set.
    pub fn get_override(&self, identifier: &str) -> DbResult<Option<StoredRateOverride>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RATE_OVERRIDES)?;
        match table.get(identifier)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Install (or replace) a per-identifier quota override.
    pub fn set_override(&self, override_: &StoredRateOverride) -> DbResult<()> {
        let json = serde_json::to_vec(override_)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RATE_OVERRIDES)?;
            table.insert(override_.identifier.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Drop a per-identifier quota override, if present.
    pub fn clear_override(&self, identifier: &str) -> DbResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RATE_OVERRIDES)?;
            table.remove(identifier)?;
        }
        write_txn.commit()?;
        Ok(())
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
    fn three_in_window_then_limited_then_reset() {
        let (db, _dir) = temp_db();
        let repo = RateLimitRepository::new(&db);
        let id = "did:rel:alice";

        // limit=3, window=1000ms
        assert!(repo.check_and_increment(id, 3, 1_000, 0).unwrap());
        assert!(repo.check_and_increment(id, 3, 1_000, 100).unwrap());
        assert!(repo.check_and_increment(id, 3, 1_000, 200).unwrap());
        assert!(!repo.check_and_increment(id, 3, 1_000, 300).unwrap());

        // Denied attempt must not consume the window
        let counter = repo.get(id).unwrap().unwrap();
        assert_eq!(counter.count, 3);
        assert_eq!(counter.window_start_ms, 0);

        // Past the window: fresh window at count 1
        assert!(repo.check_and_increment(id, 3, 1_000, 1_500).unwrap());
        let counter = repo.get(id).unwrap().unwrap();
        assert_eq!(counter.count, 1);
        assert_eq!(counter.window_start_ms, 1_500);
    }

    #[test]
    fn peek_has_no_side_effects() {
        let (db, _dir) = temp_db();
        let repo = RateLimitRepository::new(&db);
        let id = "did:rel:alice";

        assert!(repo.peek(id, 3, 1_000, 0).unwrap());
        assert!(repo.get(id).unwrap().is_none(), "peek must not create a counter");

        repo.check_and_increment(id, 1, 1_000, 0).unwrap();
        assert!(!repo.peek(id, 1, 1_000, 100).unwrap());
        assert_eq!(repo.get(id).unwrap().unwrap().count, 1);

        // Stale window peeks as within-limits without writing
        assert!(repo.peek(id, 1, 1_000, 5_000).unwrap());
        assert_eq!(repo.get(id).unwrap().unwrap().window_start_ms, 0);
    }

    #[test]
    fn concurrent_increments_never_overshoot() {
        let (db, _dir) = temp_db();
        let repo = RateLimitRepository::new(&db);
        repo.check_and_increment("did:rel:alice", 4, 60_000, 0)
            .unwrap();

        let db = std::sync::Arc::new(db);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            handles.push(std::thread::spawn(move || {
                let repo = RateLimitRepository::new(&db);
                repo.check_and_increment("did:rel:alice", 4, 60_000, 100)
                    .unwrap()
            }));
        }

        let allowed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|allowed| *allowed)
            .count();
        assert_eq!(allowed, 3, "exactly limit - 1 of the racers may pass");

        let repo = RateLimitRepository::new(&db);
        assert_eq!(repo.get("did:rel:alice").unwrap().unwrap().count, 4);
    }

    #[test]
    fn override_round_trip() {
        let (db, _dir) = temp_db();
        let repo = RateLimitRepository::new(&db);

        assert!(repo.get_override("did:rel:alice").unwrap().is_none());
        repo.set_override(&StoredRateOverride {
            identifier: "did:rel:alice".to_string(),
            limit: 1000,
            window_ms: 60_000,
        })
        .unwrap();
        assert_eq!(repo.get_override("did:rel:alice").unwrap().unwrap().limit, 1000);

        repo.clear_override("did:rel:alice").unwrap();
        assert!(repo.get_override("did:rel:alice").unwrap().is_none());
    }
}
