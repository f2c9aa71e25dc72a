//! `SeaORM` entity definitions, one module per table.

pub mod prelude;

pub mod business_settings;
pub mod businesses;
pub mod clients;
pub mod expense_categories;
pub mod expenses;
pub mod invoice_items;
pub mod invoices;
pub mod recurring_invoices;
pub mod refresh_tokens;
pub mod sea_orm_active_enums;
pub mod tax_rates;
pub mod tenants;
pub mod user_tokens;
pub mod users;
