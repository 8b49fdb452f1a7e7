// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization pattern engine.
//!
//! Patterns are regex exceptions letting unknown-tier senders reach
//! matching recipients (support desks, onboarding bots). Regexes are
//! validated and compiled at insert time; rows that nonetheless fail to
//! compile during evaluation are skipped with a warning, never fatal, so a
//! bad row cannot wedge the send path.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use lru::LruCache;
use regex::Regex;

use crate::storage::{AuthDatabase, AuthPatternRepository, DbResult, StoredAuthPattern};

use super::Tier;
use crate::auth::AuthError;

/// In-process cache of compiled pattern regexes.
///
/// Keyed by the pattern source string, so edits and re-creations are picked
/// up naturally.
pub struct RegexCache {
    cache: Mutex<LruCache<String, Regex>>,
}

impl RegexCache {
    /// Create a cache holding up to `capacity` compiled regexes.
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap()),
            )),
        }
    }

    /// Fetch a compiled regex, compiling and caching on miss.
    pub fn get_or_compile(&self, pattern: &str) -> Result<Regex, regex::Error> {
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
            let regex = Regex::new(pattern)?;
            cache.put(pattern.to_string(), regex.clone());
            return Ok(regex);
        }
        // Poisoned lock: compile uncached
        Regex::new(pattern)
    }
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Evaluates and manages tier-scoped pattern exceptions.
pub struct PatternEngine<'a> {
    db: &'a AuthDatabase,
    cache: &'a RegexCache,
}

impl<'a> PatternEngine<'a> {
    pub fn new(db: &'a AuthDatabase, cache: &'a RegexCache) -> Self {
        Self { db, cache }
    }

    /// Create a pattern. The regex must compile; a malformed one is
    /// rejected here, at write time.
    pub fn create(
        &self,
        regex: &str,
        applies_to_tier: Tier,
        priority: i32,
        expires_at: Option<DateTime<Utc>>,
        created_by: &str,
    ) -> Result<StoredAuthPattern, AuthError> {
        self.cache
            .get_or_compile(regex)
            .map_err(|e| AuthError::PatternInvalid(e.to_string()))?;

        let pattern = StoredAuthPattern {
            id: uuid::Uuid::new_v4().to_string(),
            regex: regex.to_string(),
            applies_to_tier,
            priority,
            active: true,
            expires_at,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };
        AuthPatternRepository::new(self.db).insert(&pattern)?;

        tracing::info!(
            pattern_id = %pattern.id,
            regex,
            tier = %applies_to_tier,
            priority,
            "created auth pattern"
        );
        Ok(pattern)
    }

    /// First active, unexpired pattern for `tier` matching `candidate`,
    /// in descending priority order.
    pub fn first_match(&self, candidate: &str, tier: Tier) -> DbResult<Option<StoredAuthPattern>> {
        self.first_match_at(candidate, tier, Utc::now())
    }

    pub(crate) fn first_match_at(
        &self,
        candidate: &str,
        tier: Tier,
        now: DateTime<Utc>,
    ) -> DbResult<Option<StoredAuthPattern>> {
        let patterns = AuthPatternRepository::new(self.db).list_for_tier(tier)?;

        for pattern in patterns {
            if !pattern.active {
                continue;
            }
            if pattern.expires_at.is_some_and(|exp| now > exp) {
                continue;
            }

            // Insert-time validation makes this unreachable for rows we
            // wrote; rows from older deployments still must not wedge sends
            let regex = match self.cache.get_or_compile(&pattern.regex) {
                Ok(regex) => regex,
                Err(err) => {
                    tracing::warn!(
                        pattern_id = %pattern.id,
                        error = %err,
                        "skipping malformed auth pattern"
                    );
                    continue;
                }
            };

            if regex.is_match(candidate) {
                return Ok(Some(pattern));
            }
        }
        Ok(None)
    }
}
