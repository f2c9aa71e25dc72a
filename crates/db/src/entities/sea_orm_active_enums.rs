//! `SeaORM` active enums mirroring the Postgres enum types.
//!
//! Each enum converts to and from its `factura-core` counterpart so that
//! repositories hand domain types to the rules engine.

use factura_core::auth::Role;
use factura_core::expense::ExpenseStatus as CoreExpenseStatus;
use factura_core::invoice::{InvoiceStatus as CoreInvoiceStatus, RecurringFrequency as CoreFrequency};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_role")]
pub enum UserRole {
    #[sea_orm(string_value = "PLATFORM_ADMIN")]
    PlatformAdmin,
    #[sea_orm(string_value = "BUSINESS_OWNER")]
    BusinessOwner,
    #[sea_orm(string_value = "BUSINESS_ADMIN")]
    BusinessAdmin,
    #[sea_orm(string_value = "ACCOUNTANT")]
    Accountant,
    #[sea_orm(string_value = "TEAM_MEMBER")]
    TeamMember,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "tenant_status")]
pub enum TenantStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "suspended")]
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_token_type")]
pub enum UserTokenType {
    #[sea_orm(string_value = "EMAIL_VERIFICATION")]
    EmailVerification,
    #[sea_orm(string_value = "PASSWORD_RESET")]
    PasswordReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "invoice_status")]
pub enum InvoiceStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "SENT")]
    Sent,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "OVERDUE")]
    Overdue,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "recurring_frequency")]
pub enum RecurringFrequency {
    #[sea_orm(string_value = "MONTHLY")]
    Monthly,
    #[sea_orm(string_value = "QUARTERLY")]
    Quarterly,
    #[sea_orm(string_value = "YEARLY")]
    Yearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "expense_status")]
pub enum ExpenseStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

impl From<UserRole> for Role {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::PlatformAdmin => Self::PlatformAdmin,
            UserRole::BusinessOwner => Self::BusinessOwner,
            UserRole::BusinessAdmin => Self::BusinessAdmin,
            UserRole::Accountant => Self::Accountant,
            UserRole::TeamMember => Self::TeamMember,
        }
    }
}

impl From<Role> for UserRole {
    fn from(role: Role) -> Self {
        match role {
            Role::PlatformAdmin => Self::PlatformAdmin,
            Role::BusinessOwner => Self::BusinessOwner,
            Role::BusinessAdmin => Self::BusinessAdmin,
            Role::Accountant => Self::Accountant,
            Role::TeamMember => Self::TeamMember,
        }
    }
}

impl From<InvoiceStatus> for CoreInvoiceStatus {
    fn from(status: InvoiceStatus) -> Self {
        match status {
            InvoiceStatus::Draft => Self::Draft,
            InvoiceStatus::Sent => Self::Sent,
            InvoiceStatus::Paid => Self::Paid,
            InvoiceStatus::Overdue => Self::Overdue,
            InvoiceStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<CoreInvoiceStatus> for InvoiceStatus {
    fn from(status: CoreInvoiceStatus) -> Self {
        match status {
            CoreInvoiceStatus::Draft => Self::Draft,
            CoreInvoiceStatus::Sent => Self::Sent,
            CoreInvoiceStatus::Paid => Self::Paid,
            CoreInvoiceStatus::Overdue => Self::Overdue,
            CoreInvoiceStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<RecurringFrequency> for CoreFrequency {
    fn from(frequency: RecurringFrequency) -> Self {
        match frequency {
            RecurringFrequency::Monthly => Self::Monthly,
            RecurringFrequency::Quarterly => Self::Quarterly,
            RecurringFrequency::Yearly => Self::Yearly,
        }
    }
}

impl From<CoreFrequency> for RecurringFrequency {
    fn from(frequency: CoreFrequency) -> Self {
        match frequency {
            CoreFrequency::Monthly => Self::Monthly,
            CoreFrequency::Quarterly => Self::Quarterly,
            CoreFrequency::Yearly => Self::Yearly,
        }
    }
}

impl From<ExpenseStatus> for CoreExpenseStatus {
    fn from(status: ExpenseStatus) -> Self {
        match status {
            ExpenseStatus::Draft => Self::Draft,
            ExpenseStatus::Pending => Self::Pending,
            ExpenseStatus::Approved => Self::Approved,
            ExpenseStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<CoreExpenseStatus> for ExpenseStatus {
    fn from(status: CoreExpenseStatus) -> Self {
        match status {
            CoreExpenseStatus::Draft => Self::Draft,
            CoreExpenseStatus::Pending => Self::Pending,
            CoreExpenseStatus::Approved => Self::Approved,
            CoreExpenseStatus::Rejected => Self::Rejected,
        }
    }
}
