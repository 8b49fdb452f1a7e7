// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for security-sensitive operations.
//!
//! Tier changes, role grants, session opens and authentication failures are
//! appended here. Keys are time-ordered (`!timestamp|event_id`) so a forward
//! scan yields newest-first.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::keys::time_key;

use super::super::{AuthDatabase, DbResult};

/// Table: composite (!timestamp_be|event_id) → serialized AuditEvent.
pub(crate) const AUDIT_LOG: TableDefinition<&[u8], &[u8]> = TableDefinition::new("audit_log");

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Identity events
    KeyStateRegistered,
    KeyStateRotated,

    // Tier events
    TierAssigned,

    // Role events
    RoleGranted,
    RoleRevoked,

    // Session events
    SessionOpened,

    // Auth events
    AuthSuccess,
    AuthFailure,

    // Access list events
    AccessListChanged,

    // Pattern events
    PatternCreated,
    PatternRemoved,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// Identifier that triggered the event (if known).
    pub actor: Option<String>,
    /// Identifier the event acted upon.
    pub subject: Option<String>,
    /// Additional details as JSON.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error code if the operation failed.
    pub error: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            actor: None,
            subject: None,
            details: None,
            success: true,
            error: None,
        }
    }

    /// Set the acting identifier.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Set the identifier acted upon.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Add details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with an error code.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Repository for audit events.
pub struct AuditRepository<'a> {
    db: &'a AuthDatabase,
}

impl<'a> AuditRepository<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    /// Append an audit event.
    pub fn log(&self, event: &AuditEvent) -> DbResult<()> {
        let key = time_key(event.timestamp.timestamp_millis(), &event.event_id);
        let json = serde_json::to_vec(event)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AUDIT_LOG)?;
            table.insert(key.as_slice(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Most recent events, newest first.
    pub fn recent(&self, limit: usize) -> DbResult<Vec<AuditEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_LOG)?;

        let mut events = Vec::with_capacity(limit);
        for entry in table.iter()? {
            let entry = entry?;
            events.push(serde_json::from_slice(entry.1.value())?);
            if events.len() >= limit {
                break;
            }
        }
        Ok(events)
    }

    /// Recent events involving an identifier, as actor or subject.
    pub fn recent_for(&self, identifier: &str, limit: usize) -> DbResult<Vec<AuditEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_LOG)?;

        let mut events = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            let event: AuditEvent = serde_json::from_slice(entry.1.value())?;
            if event.actor.as_deref() == Some(identifier)
                || event.subject.as_deref() == Some(identifier)
            {
                events.push(event);
                if events.len() >= limit {
                    break;
                }
            }
        }
        Ok(events)
    }
}
