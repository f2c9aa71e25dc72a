//! Invoice domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Invoice lifecycle status.
///
/// Valid transitions:
/// - Draft → Sent (send)
/// - Sent → Paid | Overdue (mark paid / mark overdue)
/// - Overdue → Paid (mark paid)
/// - Draft | Sent | Overdue → Cancelled (cancel)
///
/// Paid and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    /// Being prepared; the only editable state.
    Draft,
    /// Issued to the client.
    Sent,
    /// Settled.
    Paid,
    /// Past due and unpaid.
    Overdue,
    /// Voided.
    Cancelled,
}

impl InvoiceStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Sent => "SENT",
            Self::Paid => "PAID",
            Self::Overdue => "OVERDUE",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "SENT" => Some(Self::Sent),
            "PAID" => Some(Self::Paid),
            "OVERDUE" => Some(Self::Overdue),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true if fields and items may still change.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How often a recurring invoice is due for regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurringFrequency {
    /// Every month.
    Monthly,
    /// Every three months.
    Quarterly,
    /// Every twelve months.
    Yearly,
}

impl RecurringFrequency {
    /// Returns the string representation of the frequency.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "MONTHLY",
            Self::Quarterly => "QUARTERLY",
            Self::Yearly => "YEARLY",
        }
    }

    /// Parses a frequency from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "MONTHLY" => Some(Self::Monthly),
            "QUARTERLY" => Some(Self::Quarterly),
            "YEARLY" => Some(Self::Yearly),
            _ => None,
        }
    }

    /// Number of months between two generations.
    #[must_use]
    pub const fn months(&self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
            Self::Yearly => 12,
        }
    }
}

impl fmt::Display for RecurringFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line item as submitted by a caller, before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemInput {
    /// What was sold.
    pub description: String,
    /// Quantity, up to three decimals.
    pub quantity: Decimal,
    /// Price per unit.
    pub unit_price: Decimal,
}

/// Stored totals of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    /// Sum of line amounts.
    pub subtotal: Decimal,
    /// `subtotal * tax_rate / 100`.
    pub tax: Decimal,
    /// `subtotal + tax`.
    pub total: Decimal,
}

/// Result of a lifecycle operation, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceTransition {
    /// Draft issued to the client.
    Send {
        /// The new status.
        new_status: InvoiceStatus,
    },
    /// Payment recorded.
    MarkPaid {
        /// The new status.
        new_status: InvoiceStatus,
        /// Date the payment was received.
        paid_on: NaiveDate,
        /// Free-form payment method, e.g. "virement".
        payment_method: Option<String>,
    },
    /// Due date passed.
    MarkOverdue {
        /// The new status.
        new_status: InvoiceStatus,
    },
    /// Invoice voided.
    Cancel {
        /// The new status.
        new_status: InvoiceStatus,
        /// Notes with the cancellation reason appended.
        notes: Option<String>,
    },
}

impl InvoiceTransition {
    /// Returns the new status resulting from this transition.
    #[must_use]
    pub const fn new_status(&self) -> InvoiceStatus {
        match self {
            Self::Send { new_status }
            | Self::MarkPaid { new_status, .. }
            | Self::MarkOverdue { new_status }
            | Self::Cancel { new_status, .. } => *new_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!(InvoiceStatus::parse("sent"), Some(InvoiceStatus::Sent));
        assert_eq!(InvoiceStatus::parse("CANCELLED"), Some(InvoiceStatus::Cancelled));
        assert_eq!(InvoiceStatus::parse("void"), None);
        assert_eq!(InvoiceStatus::Overdue.to_string(), "OVERDUE");
    }

    #[test]
    fn test_only_draft_is_editable() {
        assert!(InvoiceStatus::Draft.is_editable());
        assert!(!InvoiceStatus::Sent.is_editable());
        assert!(!InvoiceStatus::Overdue.is_editable());
    }

    #[test]
    fn test_terminal_states() {
        assert!(InvoiceStatus::Paid.is_terminal());
        assert!(InvoiceStatus::Cancelled.is_terminal());
        assert!(!InvoiceStatus::Overdue.is_terminal());
    }

    #[test]
    fn test_frequency_months() {
        assert_eq!(RecurringFrequency::Monthly.months(), 1);
        assert_eq!(RecurringFrequency::Quarterly.months(), 3);
        assert_eq!(RecurringFrequency::Yearly.months(), 12);
        assert_eq!(RecurringFrequency::parse("quarterly"), Some(RecurringFrequency::Quarterly));
    }
}
