//! Invoice status state machine.

use chrono::NaiveDate;

use crate::invoice::error::InvoiceError;
use crate::invoice::types::{InvoiceStatus, InvoiceTransition};

/// Stateless service validating invoice status transitions.
///
/// Each method checks the current status and returns the transition to
/// persist, or the domain error explaining why it is not allowed.
pub struct InvoiceLifecycle;

impl InvoiceLifecycle {
    /// Ensures an edit is allowed in the current status.
    ///
    /// # Errors
    ///
    /// Returns `InvoiceError::NotDraft` unless the invoice is DRAFT.
    pub fn ensure_editable(
        status: InvoiceStatus,
        operation: &'static str,
    ) -> Result<(), InvoiceError> {
        if status.is_editable() {
            Ok(())
        } else {
            Err(InvoiceError::NotDraft { operation, status })
        }
    }

    /// DRAFT → SENT.
    ///
    /// # Errors
    ///
    /// Returns `InvoiceError::NotDraft` from any other status.
    pub fn send(status: InvoiceStatus) -> Result<InvoiceTransition, InvoiceError> {
        Self::ensure_editable(status, "send")?;
        Ok(InvoiceTransition::Send {
            new_status: InvoiceStatus::Sent,
        })
    }

    /// SENT | OVERDUE → PAID, recording the payment date (default `today`).
    ///
    /// # Errors
    ///
    /// Returns `InvoiceError::CannotMarkPaid` from any other status.
    pub fn mark_paid(
        status: InvoiceStatus,
        payment_date: Option<NaiveDate>,
        payment_method: Option<String>,
        today: NaiveDate,
    ) -> Result<InvoiceTransition, InvoiceError> {
        match status {
            InvoiceStatus::Sent | InvoiceStatus::Overdue => Ok(InvoiceTransition::MarkPaid {
                new_status: InvoiceStatus::Paid,
                paid_on: payment_date.unwrap_or(today),
                payment_method: payment_method.filter(|m| !m.trim().is_empty()),
            }),
            other => Err(InvoiceError::CannotMarkPaid(other)),
        }
    }

    /// SENT → OVERDUE.
    ///
    /// # Errors
    ///
    /// Returns `InvoiceError::CannotMarkOverdue` from any other status.
    pub fn mark_overdue(status: InvoiceStatus) -> Result<InvoiceTransition, InvoiceError> {
        match status {
            InvoiceStatus::Sent => Ok(InvoiceTransition::MarkOverdue {
                new_status: InvoiceStatus::Overdue,
            }),
            other => Err(InvoiceError::CannotMarkOverdue(other)),
        }
    }

    /// DRAFT | SENT | OVERDUE → CANCELLED.
    ///
    /// A non-blank reason is appended to the notes as `[CANCELLED] <reason>`;
    /// this is the one notes change allowed outside DRAFT.
    ///
    /// # Errors
    ///
    /// Returns `CannotCancelPaid` or `AlreadyCancelled` from terminal states.
    pub fn cancel(
        status: InvoiceStatus,
        current_notes: Option<&str>,
        reason: Option<&str>,
    ) -> Result<InvoiceTransition, InvoiceError> {
        match status {
            InvoiceStatus::Paid => return Err(InvoiceError::CannotCancelPaid),
            InvoiceStatus::Cancelled => return Err(InvoiceError::AlreadyCancelled),
            InvoiceStatus::Draft | InvoiceStatus::Sent | InvoiceStatus::Overdue => {}
        }

        let notes = match reason.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reason) => Some(
                format!("{}\n\n[CANCELLED] {reason}", current_notes.unwrap_or_default())
                    .trim()
                    .to_string(),
            ),
            None => current_notes.map(ToString::to_string),
        };

        Ok(InvoiceTransition::Cancel {
            new_status: InvoiceStatus::Cancelled,
            notes,
        })
    }

    /// Returns true if `from → to` is a transition of the state machine.
    #[must_use]
    pub fn is_valid_transition(from: InvoiceStatus, to: InvoiceStatus) -> bool {
        use InvoiceStatus as S;
        matches!(
            (from, to),
            (S::Draft, S::Sent)
                | (S::Sent, S::Paid | S::Overdue)
                | (S::Overdue, S::Paid)
                | (S::Draft | S::Sent | S::Overdue, S::Cancelled)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    #[test]
    fn test_send_from_draft_only() {
        assert_eq!(
            InvoiceLifecycle::send(InvoiceStatus::Draft).unwrap().new_status(),
            InvoiceStatus::Sent
        );
        let err = InvoiceLifecycle::send(InvoiceStatus::Sent).unwrap_err();
        assert_eq!(err.to_string(), "Can only send invoices in DRAFT status");
    }

    #[test]
    fn test_mark_paid_defaults_to_today() {
        let transition =
            InvoiceLifecycle::mark_paid(InvoiceStatus::Overdue, None, Some("virement".into()), today())
                .unwrap();
        assert_eq!(
            transition,
            InvoiceTransition::MarkPaid {
                new_status: InvoiceStatus::Paid,
                paid_on: today(),
                payment_method: Some("virement".into()),
            }
        );
    }

    #[test]
    fn test_mark_paid_on_draft_fails() {
        let err = InvoiceLifecycle::mark_paid(InvoiceStatus::Draft, None, None, today()).unwrap_err();
        assert_eq!(err.to_string(), "Can only mark SENT or OVERDUE invoices as paid");
    }

    #[test]
    fn test_mark_overdue_only_from_sent() {
        assert!(InvoiceLifecycle::mark_overdue(InvoiceStatus::Sent).is_ok());
        assert!(matches!(
            InvoiceLifecycle::mark_overdue(InvoiceStatus::Overdue),
            Err(InvoiceError::CannotMarkOverdue(InvoiceStatus::Overdue))
        ));
    }

    #[test]
    fn test_cancel_appends_reason() {
        let transition =
            InvoiceLifecycle::cancel(InvoiceStatus::Sent, Some("Net 30"), Some("client closed"))
                .unwrap();
        assert_eq!(
            transition,
            InvoiceTransition::Cancel {
                new_status: InvoiceStatus::Cancelled,
                notes: Some("Net 30\n\n[CANCELLED] client closed".into()),
            }
        );
    }

    #[test]
    fn test_cancel_without_prior_notes_is_trimmed() {
        let transition =
            InvoiceLifecycle::cancel(InvoiceStatus::Draft, None, Some("duplicate")).unwrap();
        assert!(matches!(
            transition,
            InvoiceTransition::Cancel { notes: Some(ref n), .. } if n == "[CANCELLED] duplicate"
        ));
    }

    #[test]
    fn test_cancel_without_reason_keeps_notes() {
        let transition = InvoiceLifecycle::cancel(InvoiceStatus::Overdue, Some("keep"), None).unwrap();
        assert!(matches!(
            transition,
            InvoiceTransition::Cancel { notes: Some(ref n), .. } if n == "keep"
        ));
    }

    #[test]
    fn test_cancel_terminal_states_fail() {
        assert!(matches!(
            InvoiceLifecycle::cancel(InvoiceStatus::Paid, None, None),
            Err(InvoiceError::CannotCancelPaid)
        ));
        assert!(matches!(
            InvoiceLifecycle::cancel(InvoiceStatus::Cancelled, None, None),
            Err(InvoiceError::AlreadyCancelled)
        ));
    }
}
