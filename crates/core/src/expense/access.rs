//! Ownership rules for expenses.
//!
//! The route-level policy table decides who may call an endpoint at all;
//! these checks decide what a caller may do with one particular expense.

use uuid::Uuid;

use crate::auth::Role;
use crate::expense::error::ExpenseError;
use crate::expense::types::ExpenseStatus;

/// The caller of an expense operation.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    /// Caller user id.
    pub user_id: Uuid,
    /// Caller role.
    pub role: Role,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub const fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    fn owns(&self, owner: Uuid) -> bool {
        self.user_id == owner
    }
}

/// Returns true for roles that see every expense of a business.
#[must_use]
pub const fn can_view_all(role: Role) -> bool {
    matches!(
        role,
        Role::PlatformAdmin | Role::BusinessOwner | Role::BusinessAdmin | Role::Accountant
    )
}

/// The submitter filter to apply when listing, or `None` for all expenses.
#[must_use]
pub fn list_scope(actor: &Actor) -> Option<Uuid> {
    if can_view_all(actor.role) {
        None
    } else {
        Some(actor.user_id)
    }
}

/// Checks that the actor may view an expense owned by `owner`.
///
/// # Errors
///
/// Returns `ExpenseError::NotOwnerView` for someone else's expense.
pub fn check_view(actor: &Actor, owner: Uuid) -> Result<(), ExpenseError> {
    if can_view_all(actor.role) || actor.owns(owner) {
        Ok(())
    } else {
        Err(ExpenseError::NotOwnerView)
    }
}

/// Checks that the actor may update the expense.
///
/// Owners edit their drafts only; others need BUSINESS_OWNER or ACCOUNTANT.
///
/// # Errors
///
/// * `ExpenseError::WrongStatus` for an owner outside DRAFT
/// * `ExpenseError::InsufficientPermissions` for other callers
pub fn check_update(actor: &Actor, owner: Uuid, status: ExpenseStatus) -> Result<(), ExpenseError> {
    if actor.owns(owner) {
        return require_draft("update", status);
    }
    if matches!(actor.role, Role::BusinessOwner | Role::Accountant) {
        Ok(())
    } else {
        Err(ExpenseError::InsufficientPermissions)
    }
}

/// Checks that the actor may delete the expense.
///
/// Owners delete their drafts only; others need BUSINESS_OWNER.
///
/// # Errors
///
/// * `ExpenseError::WrongStatus` for an owner outside DRAFT
/// * `ExpenseError::InsufficientPermissions` for other callers
pub fn check_delete(actor: &Actor, owner: Uuid, status: ExpenseStatus) -> Result<(), ExpenseError> {
    if actor.owns(owner) {
        return require_draft("delete", status);
    }
    if actor.role == Role::BusinessOwner {
        Ok(())
    } else {
        Err(ExpenseError::InsufficientPermissions)
    }
}

/// Checks that the actor may manage the receipt (owner or ACCOUNTANT).
///
/// # Errors
///
/// Returns `ExpenseError::InsufficientPermissions` otherwise.
pub fn check_receipt(actor: &Actor, owner: Uuid) -> Result<(), ExpenseError> {
    if actor.owns(owner) || actor.role == Role::Accountant {
        Ok(())
    } else {
        Err(ExpenseError::InsufficientPermissions)
    }
}

fn require_draft(operation: &'static str, status: ExpenseStatus) -> Result<(), ExpenseError> {
    if status == ExpenseStatus::Draft {
        Ok(())
    } else {
        Err(ExpenseError::WrongStatus {
            operation,
            required: ExpenseStatus::Draft,
            current: status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn owner() -> Uuid {
        Uuid::from_u128(1)
    }

    fn actor(role: Role, is_owner: bool) -> Actor {
        let id = if is_owner { owner() } else { Uuid::from_u128(2) };
        Actor::new(id, role)
    }

    #[rstest]
    #[case(Role::PlatformAdmin, true)]
    #[case(Role::BusinessOwner, true)]
    #[case(Role::BusinessAdmin, true)]
    #[case(Role::Accountant, true)]
    #[case(Role::TeamMember, false)]
    fn test_view_other_users_expense(#[case] role: Role, #[case] allowed: bool) {
        assert_eq!(check_view(&actor(role, false), owner()).is_ok(), allowed);
        assert!(check_view(&actor(role, true), owner()).is_ok());
    }

    #[test]
    fn test_list_scope() {
        let member = actor(Role::TeamMember, true);
        assert_eq!(list_scope(&member), Some(owner()));
        assert_eq!(list_scope(&actor(Role::Accountant, false)), None);
    }

    #[test]
    fn test_owner_updates_draft_only() {
        let me = actor(Role::TeamMember, true);
        assert!(check_update(&me, owner(), ExpenseStatus::Draft).is_ok());
        let err = check_update(&me, owner(), ExpenseStatus::Pending).unwrap_err();
        assert_eq!(err.to_string(), "Can only update expenses in DRAFT status");
    }

    #[rstest]
    #[case(Role::BusinessOwner, true)]
    #[case(Role::Accountant, true)]
    #[case(Role::BusinessAdmin, false)]
    #[case(Role::TeamMember, false)]
    fn test_non_owner_update(#[case] role: Role, #[case] allowed: bool) {
        let result = check_update(&actor(role, false), owner(), ExpenseStatus::Approved);
        assert_eq!(result.is_ok(), allowed);
    }

    #[test]
    fn test_owner_deleting_non_draft_fails() {
        let me = actor(Role::BusinessOwner, true);
        assert!(matches!(
            check_delete(&me, owner(), ExpenseStatus::Approved),
            Err(ExpenseError::WrongStatus { .. })
        ));
    }

    #[rstest]
    #[case(Role::BusinessOwner, true)]
    #[case(Role::Accountant, false)]
    #[case(Role::PlatformAdmin, false)]
    fn test_non_owner_delete(#[case] role: Role, #[case] allowed: bool) {
        let result = check_delete(&actor(role, false), owner(), ExpenseStatus::Pending);
        assert_eq!(result.is_ok(), allowed);
    }

    #[rstest]
    #[case(Role::Accountant, true)]
    #[case(Role::BusinessOwner, false)]
    #[case(Role::TeamMember, false)]
    fn test_receipt_access(#[case] role: Role, #[case] allowed: bool) {
        assert_eq!(check_receipt(&actor(role, false), owner()).is_ok(), allowed);
        assert!(check_receipt(&actor(role, true), owner()).is_ok());
    }
}
