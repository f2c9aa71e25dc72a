//! Authentication, roles and the authorization policy.
//!
//! This module provides:
//! - Password hashing with Argon2id
//! - Password verification
//! - The fixed platform role set
//! - The per-action allowed-role table

mod password;
pub mod policy;

pub use password::{PasswordError, hash_password, verify_password};
pub use policy::{Action, allowed_roles, permits};

use serde::{Deserialize, Serialize};

/// Platform roles.
///
/// Not a strict hierarchy: every guarded action lists the roles it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Operates the platform across all tenants.
    PlatformAdmin,
    /// Owns a tenant and its businesses.
    BusinessOwner,
    /// Administers businesses on the owner's behalf.
    BusinessAdmin,
    /// Handles invoices, payments and expense approval.
    Accountant,
    /// Submits expenses and drafts invoices.
    TeamMember,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::PlatformAdmin,
        Self::BusinessOwner,
        Self::BusinessAdmin,
        Self::Accountant,
        Self::TeamMember,
    ];

    /// Returns the string representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PlatformAdmin => "PLATFORM_ADMIN",
            Self::BusinessOwner => "BUSINESS_OWNER",
            Self::BusinessAdmin => "BUSINESS_ADMIN",
            Self::Accountant => "ACCOUNTANT",
            Self::TeamMember => "TEAM_MEMBER",
        }
    }

    /// Parses a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PLATFORM_ADMIN" => Some(Self::PlatformAdmin),
            "BUSINESS_OWNER" => Some(Self::BusinessOwner),
            "BUSINESS_ADMIN" => Some(Self::BusinessAdmin),
            "ACCOUNTANT" => Some(Self::Accountant),
            "TEAM_MEMBER" => Some(Self::TeamMember),
            _ => None,
        }
    }

    /// Returns true for the platform operator role.
    #[must_use]
    pub const fn is_platform_admin(&self) -> bool {
        matches!(self, Self::PlatformAdmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("accountant"), Some(Role::Accountant));
        assert_eq!(Role::parse("viewer"), None);
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::BusinessOwner.to_string(), "BUSINESS_OWNER");
        assert!(Role::PlatformAdmin.is_platform_admin());
        assert!(!Role::Accountant.is_platform_admin());
    }
}
