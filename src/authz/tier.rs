// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Trust tiers and admin roles.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Coarse trust level gating default send permissions.
///
/// ## Tier Ladder
///
/// - `Unknown` - No tier record; may only message onboarding admins
/// - `Known` - Onboarded by an admin; may message anyone
/// - `Verified` - Identity verified; may message anyone, higher quotas
///
/// Tiers move upward only, via explicit admin action. There is no automatic
/// demotion.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// No tier record exists for the identifier.
    Unknown,
    /// Onboarded by an onboarding admin.
    Known,
    /// Verified by a super admin.
    Verified,
}

impl Tier {
    /// Parse a tier from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Tier> {
        match s.to_lowercase().as_str() {
            "unknown" => Some(Tier::Unknown),
            "known" => Some(Tier::Known),
            "verified" => Some(Tier::Verified),
            _ => None,
        }
    }
}

impl Default for Tier {
    /// Absence of a tier record means `Unknown`.
    fn default() -> Self {
        Tier::Unknown
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Unknown => write!(f, "unknown"),
            Tier::Known => write!(f, "known"),
            Tier::Verified => write!(f, "verified"),
        }
    }
}

/// Administrative roles.
///
/// `SuperAdmin` strictly dominates `OnboardingAdmin`: any check for the
/// onboarding role is satisfied by an active super admin grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// May onboard unknown users to the `known` tier and receive messages
    /// from unknown senders.
    OnboardingAdmin,
    /// Full administrative access: tier assignment, role grants, patterns.
    SuperAdmin,
}

impl AdminRole {
    /// Check if this role has at least the privileges of the required role.
    pub fn dominates(&self, required: AdminRole) -> bool {
        match (self, required) {
            (AdminRole::SuperAdmin, _) => true,
            (AdminRole::OnboardingAdmin, AdminRole::OnboardingAdmin) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminRole::OnboardingAdmin => write!(f, "onboarding_admin"),
            AdminRole::SuperAdmin => write!(f, "super_admin"),
        }
    }
}
