//! Expense workflow error types.

use factura_shared::AppError;
use thiserror::Error;

use crate::expense::types::ExpenseStatus;

/// Errors raised by the expense workflow and its ownership rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpenseError {
    /// Operation requires the expense to be in a specific status.
    #[error("Can only {operation} expenses in {required} status")]
    WrongStatus {
        /// What was attempted, e.g. "submit".
        operation: &'static str,
        /// The status the operation needs.
        required: ExpenseStatus,
        /// The current status.
        current: ExpenseStatus,
    },

    /// Only the submitter may submit.
    #[error("You can only submit your own expenses")]
    NotOwnerSubmit,

    /// Caller may only see their own expenses.
    #[error("You can only view your own expenses")]
    NotOwnerView,

    /// Caller role does not allow the operation on someone else's expense.
    #[error("Insufficient permissions")]
    InsufficientPermissions,

    /// Reject needs a reason.
    #[error("Rejection reason is required")]
    RejectionReasonRequired,

    /// Amount is negative.
    #[error("Amount must not be negative")]
    NegativeAmount,

    /// Amount has more than three decimals.
    #[error("Amount allows at most 3 decimals")]
    AmountTooPrecise,
}

impl ExpenseError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::WrongStatus { .. }
            | Self::RejectionReasonRequired
            | Self::NegativeAmount
            | Self::AmountTooPrecise => 400,
            Self::NotOwnerSubmit | Self::NotOwnerView | Self::InsufficientPermissions => 403,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::WrongStatus { .. } => "INVALID_TRANSITION",
            Self::NotOwnerSubmit | Self::NotOwnerView | Self::InsufficientPermissions => {
                "FORBIDDEN"
            }
            Self::RejectionReasonRequired => "REJECTION_REASON_REQUIRED",
            Self::NegativeAmount | Self::AmountTooPrecise => "VALIDATION_ERROR",
        }
    }
}

impl From<ExpenseError> for AppError {
    fn from(err: ExpenseError) -> Self {
        let message = err.to_string();
        match err {
            ExpenseError::WrongStatus { .. } => Self::InvalidState(message),
            ExpenseError::NotOwnerSubmit
            | ExpenseError::NotOwnerView
            | ExpenseError::InsufficientPermissions => Self::Forbidden(message),
            ExpenseError::RejectionReasonRequired
            | ExpenseError::NegativeAmount
            | ExpenseError::AmountTooPrecise => {
                Self::Validation(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_status_message() {
        let err = ExpenseError::WrongStatus {
            operation: "approve",
            required: ExpenseStatus::Pending,
            current: ExpenseStatus::Draft,
        };
        assert_eq!(err.to_string(), "Can only approve expenses in PENDING status");
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
    }

    #[test]
    fn test_ownership_errors_are_forbidden() {
        for err in [
            ExpenseError::NotOwnerSubmit,
            ExpenseError::NotOwnerView,
            ExpenseError::InsufficientPermissions,
        ] {
            assert_eq!(err.status_code(), 403);
            let app: AppError = err.into();
            assert_eq!(app.status_code(), 403);
        }
    }

    #[test]
    fn test_reason_required_maps_to_validation() {
        let app: AppError = ExpenseError::RejectionReasonRequired.into();
        assert_eq!(app.error_code(), "VALIDATION_ERROR");
        assert_eq!(app.message(), "Rejection reason is required");
    }
}
