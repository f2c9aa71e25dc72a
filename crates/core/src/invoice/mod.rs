//! Invoice engine.
//!
//! Pure rules for invoices: totals from line items, number allocation, the
//! status state machine and recurring-schedule dates. Persistence and row
//! locking live in `factura-db`.
//!
//! # Modules
//!
//! - `types` - Status, frequency, line items, totals and transitions
//! - `error` - Invoice-specific error types
//! - `totals` - Line amounts, totals and item validation
//! - `numbering` - `INV-<year>-<seq>` allocation
//! - `lifecycle` - Status transitions
//! - `recurring` - Next generation date math

pub mod error;
pub mod lifecycle;
pub mod numbering;
pub mod recurring;
pub mod totals;
pub mod types;

#[cfg(test)]
mod lifecycle_props;
#[cfg(test)]
mod totals_props;

pub use error::InvoiceError;
pub use lifecycle::InvoiceLifecycle;
pub use numbering::{format_number, next_number, parse_sequence, year_prefix};
pub use recurring::{next_generation_date, validate_schedule};
pub use totals::{
    MONEY_SCALE, compute_totals, line_amount, round_money, totals_for_items, validate_item,
    validate_items, validate_quantity, validate_tax_rate, validate_unit_price,
};
pub use types::{InvoiceStatus, InvoiceTotals, InvoiceTransition, LineItemInput, RecurringFrequency};
