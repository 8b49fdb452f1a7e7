// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin role repository.
//!
//! Grants are idempotent: re-granting an active role returns the existing
//! grant, re-granting a revoked one reactivates it. Dominance (`super_admin`
//! satisfies any `onboarding_admin` requirement) is resolved in
//! [`RoleRepository::has_role`].

use chrono::{DateTime, Utc};
use redb::{ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::authz::AdminRole;
use crate::storage::keys::{pair_key, pair_prefix, pair_prefix_end};

use super::super::{AuthDatabase, DbError, DbResult};

/// Table: composite (identifier|role) → serialized StoredRole (JSON bytes).
pub(crate) const ADMIN_ROLES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("admin_roles");

/// An administrative role grant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredRole {
    /// The identifier holding the role.
    pub identifier: String,
    /// The granted role.
    pub role: AdminRole,
    /// Whether the grant is currently active.
    pub active: bool,
    /// Admin identifier that performed the grant.
    pub granted_by: String,
    /// When the role was (last) granted.
    pub granted_at: DateTime<Utc>,
    /// When the role was revoked (if inactive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Repository for admin roles.
pub struct RoleRepository<'a> {
    db: &'a AuthDatabase,
}

impl<'a> RoleRepository<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    fn role_key(identifier: &str, role: AdminRole) -> Vec<u8> {
        pair_key(identifier, &role.to_string())
    }

    /// Look up a specific grant.
    pub fn get(&self, identifier: &str, role: AdminRole) -> DbResult<Option<StoredRole>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ADMIN_ROLES)?;
        match table.get(Self::role_key(identifier, role).as_slice())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Grant a role, reactivating a previously revoked grant if present.
    pub fn grant(
        &self,
        identifier: &str,
        role: AdminRole,
        granted_by: &str,
    ) -> DbResult<StoredRole> {
        let key = Self::role_key(identifier, role);
        let write_txn = self.db.begin_write()?;
        let grant = {
            let mut table = write_txn.open_table(ADMIN_ROLES)?;

            let existing: Option<StoredRole> = match table.get(key.as_slice())? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };

            match existing {
                Some(grant) if grant.active => grant,
                _ => {
                    let grant = StoredRole {
                        identifier: identifier.to_string(),
                        role,
                        active: true,
                        granted_by: granted_by.to_string(),
                        granted_at: Utc::now(),
                        revoked_at: None,
                    };
                    let json = serde_json::to_vec(&grant)?;
                    table.insert(key.as_slice(), json.as_slice())?;
                    grant
                }
            }
        };
        write_txn.commit()?;
        Ok(grant)
    }

    /// Revoke an active grant. Fails with `NotFound` when no active grant
    /// exists.
    pub fn revoke(&self, identifier: &str, role: AdminRole) -> DbResult<StoredRole> {
        let key = Self::role_key(identifier, role);
        let write_txn = self.db.begin_write()?;
        let grant = {
            let mut table = write_txn.open_table(ADMIN_ROLES)?;

            let existing_bytes = {
                let existing = table.get(key.as_slice())?.ok_or_else(|| {
                    DbError::NotFound(format!("role {role} for {identifier}"))
                })?;
                existing.value().to_vec()
            };

            let mut grant: StoredRole = serde_json::from_slice(&existing_bytes)?;
            if !grant.active {
                return Err(DbError::NotFound(format!(
                    "active role {role} for {identifier}"
                )));
            }

            grant.active = false;
            grant.revoked_at = Some(Utc::now());
            let json = serde_json::to_vec(&grant)?;
            table.insert(key.as_slice(), json.as_slice())?;
            grant
        };
        write_txn.commit()?;
        Ok(grant)
    }

    /// Whether the identifier holds an active grant satisfying `required`,
    /// accounting for dominance.
    pub fn has_role(&self, identifier: &str, required: AdminRole) -> DbResult<bool> {
        for role in [AdminRole::SuperAdmin, AdminRole::OnboardingAdmin] {
            if !role.dominates(required) {
                continue;
            }
            if let Some(grant) = self.get(identifier, role)? {
                if grant.active {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// List all grants (active and revoked) for an identifier.
    pub fn list(&self, identifier: &str) -> DbResult<Vec<StoredRole>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ADMIN_ROLES)?;

        let start = pair_prefix(identifier);
        let end = pair_prefix_end(identifier);

        let mut grants = Vec::new();
        for entry in table.range(start.as_slice()..end.as_slice())? {
            let entry = entry?;
            grants.push(serde_json::from_slice(entry.1.value())?);
        }
        Ok(grants)
    }
}
