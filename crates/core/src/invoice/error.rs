//! Invoice engine error types.

use chrono::NaiveDate;
use factura_shared::AppError;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::invoice::types::InvoiceStatus;

/// Errors raised by invoice validation and lifecycle rules.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// Operation requires a DRAFT invoice.
    #[error("Can only {operation} invoices in DRAFT status")]
    NotDraft {
        /// What was attempted, e.g. "update" or "add items to".
        operation: &'static str,
        /// The current status.
        status: InvoiceStatus,
    },

    /// `markPaid` on something other than SENT or OVERDUE.
    #[error("Can only mark SENT or OVERDUE invoices as paid")]
    CannotMarkPaid(InvoiceStatus),

    /// `markOverdue` on something other than SENT.
    #[error("Can only mark SENT invoices as overdue")]
    CannotMarkOverdue(InvoiceStatus),

    /// PAID is terminal.
    #[error("Cannot cancel a paid invoice")]
    CannotCancelPaid,

    /// CANCELLED is terminal.
    #[error("Invoice is already cancelled")]
    AlreadyCancelled,

    /// An invoice needs at least one line.
    #[error("Invoice must have at least one item")]
    NoItems,

    /// Quantity must be at least 0.001.
    #[error("Quantity must be at least 0.001, got {0}")]
    InvalidQuantity(Decimal),

    /// Unit price must not be negative.
    #[error("Unit price must not be negative, got {0}")]
    NegativeUnitPrice(Decimal),

    /// Line description is empty.
    #[error("Item description is required")]
    MissingDescription,

    /// Tax rate outside 0..=100.
    #[error("Tax rate must be between 0 and 100, got {0}")]
    InvalidTaxRate(Decimal),

    /// A quantity, price or rate has more decimals than are stored.
    #[error("{field} allows at most {max_scale} decimals, got {value}")]
    TooPrecise {
        /// Offending field.
        field: &'static str,
        /// Stored decimal places.
        max_scale: u32,
        /// Submitted value.
        value: Decimal,
    },

    /// Recurring schedule ends before it starts.
    #[error("end_date {end} is before start_date {start}")]
    InvalidSchedule {
        /// Schedule start.
        start: NaiveDate,
        /// Schedule end.
        end: NaiveDate,
    },

    /// Date arithmetic left the supported calendar range.
    #[error("Date out of range")]
    DateOutOfRange,
}

impl InvoiceError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        400
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotDraft { .. } => "INVOICE_NOT_DRAFT",
            Self::CannotMarkPaid(_) | Self::CannotMarkOverdue(_) => "INVALID_TRANSITION",
            Self::CannotCancelPaid => "INVOICE_PAID",
            Self::AlreadyCancelled => "INVOICE_CANCELLED",
            Self::NoItems
            | Self::InvalidQuantity(_)
            | Self::NegativeUnitPrice(_)
            | Self::MissingDescription
            | Self::InvalidTaxRate(_)
            | Self::TooPrecise { .. }
            | Self::InvalidSchedule { .. }
            | Self::DateOutOfRange => "VALIDATION_ERROR",
        }
    }

    /// Returns true for input validation failures, as opposed to state conflicts.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(
            self,
            Self::NotDraft { .. }
                | Self::CannotMarkPaid(_)
                | Self::CannotMarkOverdue(_)
                | Self::CannotCancelPaid
                | Self::AlreadyCancelled
        )
    }
}

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        if err.is_validation() {
            Self::Validation(err.to_string())
        } else {
            Self::InvalidState(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_draft_message() {
        let err = InvoiceError::NotDraft {
            operation: "add items to",
            status: InvoiceStatus::Sent,
        };
        assert_eq!(err.to_string(), "Can only add items to invoices in DRAFT status");
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "INVOICE_NOT_DRAFT");
    }

    #[test]
    fn test_conversion_to_app_error() {
        let app: AppError = InvoiceError::CannotCancelPaid.into();
        assert!(matches!(app, AppError::InvalidState(ref m) if m == "Cannot cancel a paid invoice"));

        let app: AppError = InvoiceError::NoItems.into();
        assert!(matches!(app, AppError::Validation(_)));
    }
}
