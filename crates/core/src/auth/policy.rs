//! Authorization policy: which roles may perform which action.
//!
//! The whole table lives in [`allowed_roles`]. An action mapped to `None` is
//! open to any authenticated principal. Ownership checks (tenant, business,
//! expense submitter) are separate and happen in the handlers.

use super::Role;

/// A guarded operation exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    // Users
    /// List users.
    UserList,
    /// Read one user.
    UserRead,
    /// Update a user's profile fields.
    UserUpdate,
    /// Delete a user.
    UserDelete,
    /// Change a user's role.
    UserChangeRole,
    /// Suspend a user.
    UserSuspend,
    /// Reactivate a suspended user.
    UserActivate,

    // Tenants
    /// Create a tenant.
    TenantCreate,
    /// List all tenants.
    TenantList,
    /// Read the caller's own tenant.
    TenantReadOwn,
    /// Read a tenant by id.
    TenantRead,
    /// Update a tenant.
    TenantUpdate,
    /// Delete a tenant.
    TenantDelete,

    // Businesses
    /// Create a business.
    BusinessCreate,
    /// List businesses.
    BusinessList,
    /// Read a business.
    BusinessRead,
    /// Update a business.
    BusinessUpdate,
    /// Delete a business.
    BusinessDelete,
    /// Read business settings.
    SettingsRead,
    /// Update business settings.
    SettingsUpdate,
    /// Create a tax rate.
    TaxRateCreate,
    /// List or read tax rates.
    TaxRateRead,
    /// Update a tax rate.
    TaxRateUpdate,
    /// Delete a tax rate.
    TaxRateDelete,

    // Clients
    /// Create a client.
    ClientCreate,
    /// List or read clients, and a client's invoices.
    ClientRead,
    /// Update a client or append to its communication log.
    ClientUpdate,
    /// Delete a client.
    ClientDelete,

    // Invoices
    /// Create an invoice.
    InvoiceCreate,
    /// List, read or download invoices.
    InvoiceRead,
    /// Update or delete a draft invoice and its items.
    InvoiceEdit,
    /// Send, mark paid, mark overdue or cancel.
    InvoiceTransition,
    /// Regenerate the stored PDF.
    InvoiceRegeneratePdf,
    /// Create, list, update or disable recurring schedules.
    RecurringManage,

    // Expenses
    /// Create, read, update, delete, submit expenses and manage receipts.
    ExpenseOwn,
    /// Approve or reject a pending expense.
    ExpenseDecide,
    /// List expense categories.
    CategoryRead,
    /// Create, update or delete expense categories.
    CategoryManage,
}

const ADMIN_ONLY: &[Role] = &[Role::PlatformAdmin];
const ADMIN_OR_OWNER: &[Role] = &[Role::PlatformAdmin, Role::BusinessOwner];
const OWNER_OR_BUSINESS_ADMIN: &[Role] = &[Role::BusinessOwner, Role::BusinessAdmin];
const OWNER_OR_ACCOUNTANT: &[Role] = &[Role::BusinessOwner, Role::Accountant];

/// Returns the roles allowed to perform `action`, or `None` when any
/// authenticated principal may.
#[must_use]
pub const fn allowed_roles(action: Action) -> Option<&'static [Role]> {
    use Action as A;
    match action {
        A::UserList
        | A::UserRead
        | A::UserUpdate
        | A::UserDelete
        | A::UserChangeRole
        | A::UserSuspend
        | A::UserActivate
        | A::TenantCreate
        | A::TenantList
        | A::TenantDelete => Some(ADMIN_ONLY),

        A::TenantReadOwn => Some(OWNER_OR_BUSINESS_ADMIN),
        A::TenantRead | A::TenantUpdate | A::BusinessCreate | A::BusinessDelete => {
            Some(ADMIN_OR_OWNER)
        }

        A::BusinessUpdate => Some(&[Role::PlatformAdmin, Role::BusinessOwner, Role::BusinessAdmin]),
        A::SettingsRead | A::ClientUpdate => {
            Some(&[Role::BusinessOwner, Role::BusinessAdmin, Role::Accountant])
        }
        A::SettingsUpdate
        | A::TaxRateCreate
        | A::TaxRateUpdate
        | A::TaxRateDelete
        | A::ClientDelete
        | A::CategoryManage => Some(OWNER_OR_BUSINESS_ADMIN),

        A::ClientCreate => Some(&Role::ALL),

        A::InvoiceCreate => Some(&[
            Role::PlatformAdmin,
            Role::BusinessOwner,
            Role::Accountant,
            Role::TeamMember,
        ]),
        A::InvoiceEdit | A::InvoiceTransition | A::InvoiceRegeneratePdf | A::RecurringManage => {
            Some(OWNER_OR_ACCOUNTANT)
        }

        A::ExpenseDecide => Some(&[Role::Accountant, Role::BusinessOwner, Role::BusinessAdmin]),

        A::BusinessList
        | A::BusinessRead
        | A::TaxRateRead
        | A::ClientRead
        | A::InvoiceRead
        | A::ExpenseOwn
        | A::CategoryRead => None,
    }
}

/// Returns true if `role` may perform `action`.
#[must_use]
pub fn permits(role: Role, action: Action) -> bool {
    allowed_roles(action).is_none_or(|roles| roles.contains(&role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Role::PlatformAdmin, Action::UserList, true)]
    #[case(Role::BusinessOwner, Action::UserList, false)]
    #[case(Role::BusinessAdmin, Action::TenantReadOwn, true)]
    #[case(Role::PlatformAdmin, Action::TenantReadOwn, false)]
    #[case(Role::BusinessAdmin, Action::BusinessUpdate, true)]
    #[case(Role::Accountant, Action::BusinessUpdate, false)]
    #[case(Role::Accountant, Action::SettingsRead, true)]
    #[case(Role::Accountant, Action::SettingsUpdate, false)]
    #[case(Role::TeamMember, Action::ClientCreate, true)]
    #[case(Role::TeamMember, Action::ClientUpdate, false)]
    #[case(Role::TeamMember, Action::InvoiceCreate, true)]
    #[case(Role::BusinessAdmin, Action::InvoiceCreate, false)]
    #[case(Role::Accountant, Action::InvoiceTransition, true)]
    #[case(Role::TeamMember, Action::InvoiceEdit, false)]
    #[case(Role::BusinessAdmin, Action::ExpenseDecide, true)]
    #[case(Role::TeamMember, Action::ExpenseDecide, false)]
    #[case(Role::TeamMember, Action::ExpenseOwn, true)]
    #[case(Role::Accountant, Action::CategoryManage, false)]
    fn test_policy_table(#[case] role: Role, #[case] action: Action, #[case] expected: bool) {
        assert_eq!(permits(role, action), expected);
    }

    #[test]
    fn test_open_actions_accept_every_role() {
        for role in Role::ALL {
            assert!(permits(role, Action::InvoiceRead));
            assert!(permits(role, Action::CategoryRead));
        }
    }
}
