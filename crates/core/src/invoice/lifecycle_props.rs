//! Property-based tests for the invoice state machine.

use chrono::NaiveDate;
use proptest::prelude::*;

use crate::invoice::error::InvoiceError;
use crate::invoice::lifecycle::InvoiceLifecycle;
use crate::invoice::types::InvoiceStatus;

fn arb_status() -> impl Strategy<Value = InvoiceStatus> {
    prop_oneof![
        Just(InvoiceStatus::Draft),
        Just(InvoiceStatus::Sent),
        Just(InvoiceStatus::Paid),
        Just(InvoiceStatus::Overdue),
        Just(InvoiceStatus::Cancelled),
    ]
}

fn arb_reason() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), "[a-zA-Z0-9 ]{0,60}".prop_map(Some)]
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap_or_default()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every successful operation lands on a state the transition table allows.
    #[test]
    fn prop_results_match_transition_table(status in arb_status()) {
        let results = [
            InvoiceLifecycle::send(status),
            InvoiceLifecycle::mark_paid(status, None, None, today()),
            InvoiceLifecycle::mark_overdue(status),
            InvoiceLifecycle::cancel(status, None, None),
        ];
        for transition in results.into_iter().flatten() {
            prop_assert!(InvoiceLifecycle::is_valid_transition(status, transition.new_status()));
        }
    }

    /// Terminal states reject every operation.
    #[test]
    fn prop_terminal_states_reject_everything(status in arb_status()) {
        prop_assume!(status.is_terminal());
        prop_assert!(InvoiceLifecycle::send(status).is_err());
        prop_assert!(InvoiceLifecycle::mark_paid(status, None, None, today()).is_err());
        prop_assert!(InvoiceLifecycle::mark_overdue(status).is_err());
        prop_assert!(InvoiceLifecycle::cancel(status, None, None).is_err());
    }

    /// Only DRAFT is editable.
    #[test]
    fn prop_only_draft_editable(status in arb_status()) {
        let result = InvoiceLifecycle::ensure_editable(status, "update");
        if status == InvoiceStatus::Draft {
            prop_assert!(result.is_ok());
        } else {
            let is_not_draft = matches!(result, Err(InvoiceError::NotDraft { .. }));
            prop_assert!(is_not_draft);
        }
    }

    /// Cancel keeps the previous notes as a prefix.
    #[test]
    fn prop_cancel_preserves_notes(notes in "[a-zA-Z0-9]{1,40}", reason in arb_reason()) {
        let transition = InvoiceLifecycle::cancel(InvoiceStatus::Sent, Some(&notes), reason.as_deref());
        if let Ok(crate::invoice::types::InvoiceTransition::Cancel { notes: Some(updated), .. }) = transition {
            prop_assert!(updated.starts_with(&notes));
        } else {
            prop_assert!(false, "expected a Cancel transition with notes");
        }
    }
}
