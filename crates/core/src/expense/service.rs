//! Expense workflow state transitions.

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::business::fits_scale;
use crate::expense::error::ExpenseError;
use crate::invoice::MONEY_SCALE;
use crate::expense::types::{ExpenseAction, ExpenseStatus};

/// Stateless service validating expense status transitions.
///
/// Each method returns the `ExpenseAction` to persist, carrying the audit
/// fields the repository writes.
pub struct ExpenseWorkflow;

impl ExpenseWorkflow {
    /// Submit a draft expense for approval.
    ///
    /// Only the expense's owner may submit it.
    ///
    /// # Errors
    ///
    /// * `ExpenseError::NotOwnerSubmit` if `caller != owner`
    /// * `ExpenseError::WrongStatus` if not in Draft status
    pub fn submit(
        current_status: ExpenseStatus,
        owner: Uuid,
        caller: Uuid,
    ) -> Result<ExpenseAction, ExpenseError> {
        if owner != caller {
            return Err(ExpenseError::NotOwnerSubmit);
        }

        match current_status {
            ExpenseStatus::Draft => Ok(ExpenseAction::Submit {
                new_status: ExpenseStatus::Pending,
            }),
            current => Err(ExpenseError::WrongStatus {
                operation: "submit",
                required: ExpenseStatus::Draft,
                current,
            }),
        }
    }

    /// Approve a pending expense.
    ///
    /// # Errors
    ///
    /// Returns `ExpenseError::WrongStatus` if not in Pending status.
    pub fn approve(
        current_status: ExpenseStatus,
        approved_by: Uuid,
        approval_notes: Option<String>,
    ) -> Result<ExpenseAction, ExpenseError> {
        match current_status {
            ExpenseStatus::Pending => Ok(ExpenseAction::Approve {
                new_status: ExpenseStatus::Approved,
                approved_by,
                approved_at: Utc::now(),
                approval_notes: approval_notes.filter(|n| !n.trim().is_empty()),
            }),
            current => Err(ExpenseError::WrongStatus {
                operation: "approve",
                required: ExpenseStatus::Pending,
                current,
            }),
        }
    }

    /// Reject a pending expense. The reason becomes the approval notes.
    ///
    /// # Errors
    ///
    /// * `ExpenseError::RejectionReasonRequired` if the reason is blank
    /// * `ExpenseError::WrongStatus` if not in Pending status
    pub fn reject(
        current_status: ExpenseStatus,
        rejected_by: Uuid,
        reason: &str,
    ) -> Result<ExpenseAction, ExpenseError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ExpenseError::RejectionReasonRequired);
        }

        match current_status {
            ExpenseStatus::Pending => Ok(ExpenseAction::Reject {
                new_status: ExpenseStatus::Rejected,
                approved_by: rejected_by,
                approved_at: Utc::now(),
                approval_notes: reason.to_string(),
            }),
            current => Err(ExpenseError::WrongStatus {
                operation: "reject",
                required: ExpenseStatus::Pending,
                current,
            }),
        }
    }

    /// Checks an expense amount.
    ///
    /// # Errors
    ///
    /// Returns `ExpenseError::NegativeAmount` below zero and
    /// `ExpenseError::AmountTooPrecise` beyond three decimals.
    pub fn validate_amount(amount: Decimal) -> Result<(), ExpenseError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            Err(ExpenseError::NegativeAmount)
        } else if !fits_scale(amount, MONEY_SCALE) {
            Err(ExpenseError::AmountTooPrecise)
        } else {
            Ok(())
        }
    }

    /// Check if a status transition is valid.
    #[must_use]
    pub const fn is_valid_transition(from: ExpenseStatus, to: ExpenseStatus) -> bool {
        matches!(
            (from, to),
            (ExpenseStatus::Draft, ExpenseStatus::Pending)
                | (
                    ExpenseStatus::Pending,
                    ExpenseStatus::Approved | ExpenseStatus::Rejected
                )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_by_owner_from_draft() {
        let owner = Uuid::new_v4();
        let action = ExpenseWorkflow::submit(ExpenseStatus::Draft, owner, owner).unwrap();
        assert_eq!(action.new_status(), ExpenseStatus::Pending);
    }

    #[test]
    fn test_submit_by_other_user_fails() {
        let result = ExpenseWorkflow::submit(ExpenseStatus::Draft, Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(result, Err(ExpenseError::NotOwnerSubmit));
    }

    #[test]
    fn test_submit_twice_fails() {
        let owner = Uuid::new_v4();
        let err = ExpenseWorkflow::submit(ExpenseStatus::Pending, owner, owner).unwrap_err();
        assert_eq!(err.to_string(), "Can only submit expenses in DRAFT status");
    }

    #[test]
    fn test_approve_records_approver() {
        let approver = Uuid::new_v4();
        let action =
            ExpenseWorkflow::approve(ExpenseStatus::Pending, approver, Some("ok".into())).unwrap();
        match action {
            ExpenseAction::Approve {
                new_status,
                approved_by,
                approval_notes,
                ..
            } => {
                assert_eq!(new_status, ExpenseStatus::Approved);
                assert_eq!(approved_by, approver);
                assert_eq!(approval_notes.as_deref(), Some("ok"));
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_approve_from_draft_fails() {
        let err = ExpenseWorkflow::approve(ExpenseStatus::Draft, Uuid::new_v4(), None).unwrap_err();
        assert_eq!(err.to_string(), "Can only approve expenses in PENDING status");
    }

    #[test]
    fn test_reject_stores_reason_as_notes() {
        let action =
            ExpenseWorkflow::reject(ExpenseStatus::Pending, Uuid::new_v4(), "  no receipt ").unwrap();
        assert!(matches!(
            action,
            ExpenseAction::Reject { ref approval_notes, .. } if approval_notes == "no receipt"
        ));
        assert_eq!(action.new_status(), ExpenseStatus::Rejected);
    }

    #[test]
    fn test_reject_requires_reason() {
        assert_eq!(
            ExpenseWorkflow::reject(ExpenseStatus::Pending, Uuid::new_v4(), "   "),
            Err(ExpenseError::RejectionReasonRequired)
        );
    }

    #[test]
    fn test_decided_expenses_cannot_be_decided_again() {
        for status in [ExpenseStatus::Approved, ExpenseStatus::Rejected] {
            assert!(ExpenseWorkflow::approve(status, Uuid::new_v4(), None).is_err());
            assert!(ExpenseWorkflow::reject(status, Uuid::new_v4(), "late").is_err());
        }
    }

    #[test]
    fn test_validate_amount() {
        assert!(ExpenseWorkflow::validate_amount(Decimal::ZERO).is_ok());
        assert!(ExpenseWorkflow::validate_amount(Decimal::new(1250, 2)).is_ok());
        assert_eq!(
            ExpenseWorkflow::validate_amount(Decimal::new(-1, 2)),
            Err(ExpenseError::NegativeAmount)
        );
        assert!(ExpenseWorkflow::validate_amount(Decimal::new(12_5000, 4)).is_ok());
        assert_eq!(
            ExpenseWorkflow::validate_amount(Decimal::new(12_5005, 4)),
            Err(ExpenseError::AmountTooPrecise)
        );
    }

    #[test]
    fn test_valid_transitions() {
        use ExpenseStatus as S;
        assert!(ExpenseWorkflow::is_valid_transition(S::Draft, S::Pending));
        assert!(ExpenseWorkflow::is_valid_transition(S::Pending, S::Approved));
        assert!(ExpenseWorkflow::is_valid_transition(S::Pending, S::Rejected));
        assert!(!ExpenseWorkflow::is_valid_transition(S::Rejected, S::Draft));
        assert!(!ExpenseWorkflow::is_valid_transition(S::Approved, S::Pending));
    }
}
