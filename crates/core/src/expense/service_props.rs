//! Property-based tests for the expense workflow.

use proptest::prelude::*;
use uuid::Uuid;

use crate::auth::Role;
use crate::expense::access::{Actor, check_delete, check_update};
use crate::expense::error::ExpenseError;
use crate::expense::service::ExpenseWorkflow;
use crate::expense::types::ExpenseStatus;

fn arb_status() -> impl Strategy<Value = ExpenseStatus> {
    prop_oneof![
        Just(ExpenseStatus::Draft),
        Just(ExpenseStatus::Pending),
        Just(ExpenseStatus::Approved),
        Just(ExpenseStatus::Rejected),
    ]
}

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::PlatformAdmin),
        Just(Role::BusinessOwner),
        Just(Role::BusinessAdmin),
        Just(Role::Accountant),
        Just(Role::TeamMember),
    ]
}

fn arb_uuid() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

fn arb_reason() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9]{1,50}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// approve and reject succeed exactly from PENDING.
    #[test]
    fn prop_decisions_require_pending(status in arb_status(), approver in arb_uuid(), reason in arb_reason()) {
        let approve = ExpenseWorkflow::approve(status, approver, None);
        let reject = ExpenseWorkflow::reject(status, approver, &reason);
        prop_assert_eq!(approve.is_ok(), status == ExpenseStatus::Pending);
        prop_assert_eq!(reject.is_ok(), status == ExpenseStatus::Pending);
    }

    /// Submitting someone else's expense always fails, whatever the status.
    #[test]
    fn prop_submit_by_non_owner_fails(status in arb_status(), owner in arb_uuid(), caller in arb_uuid()) {
        prop_assume!(owner != caller);
        prop_assert_eq!(
            ExpenseWorkflow::submit(status, owner, caller),
            Err(ExpenseError::NotOwnerSubmit)
        );
    }

    /// Every successful action follows the transition table.
    #[test]
    fn prop_actions_follow_transition_table(status in arb_status(), user in arb_uuid(), reason in arb_reason()) {
        let results = [
            ExpenseWorkflow::submit(status, user, user),
            ExpenseWorkflow::approve(status, user, None),
            ExpenseWorkflow::reject(status, user, &reason),
        ];
        for action in results.into_iter().flatten() {
            prop_assert!(ExpenseWorkflow::is_valid_transition(status, action.new_status()));
        }
    }

    /// Owners can neither edit nor delete outside DRAFT, regardless of role.
    #[test]
    fn prop_owner_locked_out_after_draft(status in arb_status(), role in arb_role(), owner in arb_uuid()) {
        let actor = Actor::new(owner, role);
        let draft = status == ExpenseStatus::Draft;
        prop_assert_eq!(check_update(&actor, owner, status).is_ok(), draft);
        prop_assert_eq!(check_delete(&actor, owner, status).is_ok(), draft);
    }
}
