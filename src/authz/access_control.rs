// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-recipient allow/deny overrides.
//!
//! Evaluated independently of tier, deny first: a sender on the recipient's
//! deny-list is rejected even when also allow-listed. An allow-list with at
//! least one entry excludes every unlisted sender; an empty allow-list
//! permits all.

use crate::auth::AuthError;
use crate::storage::{AccessList, AccessListRepository, AuthDatabase};

/// Applies the recipient's allow/deny overrides to a delivery.
pub struct AccessControlEngine<'a> {
    db: &'a AuthDatabase,
}

impl<'a> AccessControlEngine<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    /// Check `from` against `to`'s lists.
    pub fn check_delivery(&self, from: &str, to: &str) -> Result<(), AuthError> {
        let repo = AccessListRepository::new(self.db);

        if repo.contains(AccessList::Deny, to, from)? {
            return Err(AuthError::DenyListed);
        }

        if repo.is_active(AccessList::Allow, to)? && !repo.contains(AccessList::Allow, to, from)? {
            return Err(AuthError::NotOnAllowList);
        }

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
    fn empty_lists_permit_all() {
        let (db, _dir) = temp_db();
        let engine = AccessControlEngine::new(&db);
        assert!(engine.check_delivery("did:rel:anyone", "did:rel:bob").is_ok());
    }

    #[test]
    fn deny_list_rejects() {
        let (db, _dir) = temp_db();
        let repo = AccessListRepository::new(&db);
        repo.add(AccessList::Deny, "did:rel:bob", "did:rel:mallory", None)
            .unwrap();

        let engine = AccessControlEngine::new(&db);
        assert_eq!(
            engine.check_delivery("did:rel:mallory", "did:rel:bob"),
            Err(AuthError::DenyListed)
        );
        // Other senders unaffected
        assert!(engine.check_delivery("did:rel:alice", "did:rel:bob").is_ok());
    }

    #[test]
    fn deny_wins_over_allow() {
        let (db, _dir) = temp_db();
        let repo = AccessListRepository::new(&db);
        repo.add(AccessList::Allow, "did:rel:bob", "did:rel:mallory", None)
            .unwrap();
        repo.add(AccessList::Deny, "did:rel:bob", "did:rel:mallory", None)
            .unwrap();

        let engine = AccessControlEngine::new(&db);
        assert_eq!(
            engine.check_delivery("did:rel:mallory", "did:rel:bob"),
            Err(AuthError::DenyListed)
        );
    }

    #[test]
    fn active_allow_list_excludes_unlisted() {
        let (db, _dir) = temp_db();
        let repo = AccessListRepository::new(&db);
        repo.add(AccessList::Allow, "did:rel:bob", "did:rel:alice", None)
            .unwrap();

        let engine = AccessControlEngine::new(&db);
        assert!(engine.check_delivery("did:rel:alice", "did:rel:bob").is_ok());
        assert_eq!(
            engine.check_delivery("did:rel:carol", "did:rel:bob"),
            Err(AuthError::NotOnAllowList)
        );
    }
}
