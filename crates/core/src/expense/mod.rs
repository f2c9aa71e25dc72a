//! Expense approval workflow.
//!
//! # Modules
//!
//! - `types` - Expense status and workflow actions
//! - `error` - Expense-specific error types
//! - `service` - State transition logic
//! - `access` - Per-expense ownership checks

pub mod access;
pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use access::{Actor, can_view_all, check_delete, check_receipt, check_update, check_view, list_scope};
pub use error::ExpenseError;
pub use service::ExpenseWorkflow;
pub use types::{ExpenseAction, ExpenseStatus};
