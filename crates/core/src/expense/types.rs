//! Expense workflow domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Expense status in the approval workflow.
///
/// The valid transitions are:
/// - Draft → Pending (submit, owner only)
/// - Pending → Approved (approve)
/// - Pending → Rejected (reject)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseStatus {
    /// Being drafted by its submitter.
    Draft,
    /// Waiting for an approver.
    Pending,
    /// Accepted by an approver.
    Approved,
    /// Refused by an approver.
    Rejected,
}

impl ExpenseStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true if the expense has been decided.
    #[must_use]
    pub const fn is_decided(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A workflow step with its audit data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpenseAction {
    /// Owner hands the expense to approvers.
    Submit {
        /// Always `Pending`.
        new_status: ExpenseStatus,
    },
    /// Approver accepts the expense.
    Approve {
        /// Always `Approved`.
        new_status: ExpenseStatus,
        /// The approver.
        approved_by: Uuid,
        /// When the decision was taken.
        approved_at: DateTime<Utc>,
        /// Optional approver notes.
        approval_notes: Option<String>,
    },
    /// Approver refuses the expense; the reason is stored as the notes.
    Reject {
        /// Always `Rejected`.
        new_status: ExpenseStatus,
        /// The approver.
        approved_by: Uuid,
        /// When the decision was taken.
        approved_at: DateTime<Utc>,
        /// The rejection reason.
        approval_notes: String,
    },
}

impl ExpenseAction {
    /// Returns the new status resulting from this action.
    #[must_use]
    pub const fn new_status(&self) -> ExpenseStatus {
        match self {
            Self::Submit { new_status }
            | Self::Approve { new_status, .. }
            | Self::Reject { new_status, .. } => *new_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            ExpenseStatus::Draft,
            ExpenseStatus::Pending,
            ExpenseStatus::Approved,
            ExpenseStatus::Rejected,
        ] {
            assert_eq!(ExpenseStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ExpenseStatus::parse("pending"), Some(ExpenseStatus::Pending));
        assert_eq!(ExpenseStatus::parse("posted"), None);
    }

    #[test]
    fn test_is_decided() {
        assert!(!ExpenseStatus::Draft.is_decided());
        assert!(!ExpenseStatus::Pending.is_decided());
        assert!(ExpenseStatus::Approved.is_decided());
        assert!(ExpenseStatus::Rejected.is_decided());
    }
}
