// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::authz::RegexCache;
use crate::storage::AuthDatabase;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<AuthDatabase>,
    pub regex_cache: Arc<RegexCache>,
}

impl AppState {
    pub fn new(db: AuthDatabase) -> Self {
        Self {
            db: Arc::new(db),
            regex_cache: Arc::new(RegexCache::default()),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Fresh state over a temp database. Keep the guard alive for the test.
    pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = AuthDatabase::open(&dir.path().join("test.redb")).unwrap();
        (AppState::new(db), dir)
    }
}
