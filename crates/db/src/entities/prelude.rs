//! Entity re-exports.

pub use super::business_settings::Entity as BusinessSettings;
pub use super::businesses::Entity as Businesses;
pub use super::clients::Entity as Clients;
pub use super::expense_categories::Entity as ExpenseCategories;
pub use super::expenses::Entity as Expenses;
pub use super::invoice_items::Entity as InvoiceItems;
pub use super::invoices::Entity as Invoices;
pub use super::recurring_invoices::Entity as RecurringInvoices;
pub use super::refresh_tokens::Entity as RefreshTokens;
pub use super::tax_rates::Entity as TaxRates;
pub use super::tenants::Entity as Tenants;
pub use super::user_tokens::Entity as UserTokens;
pub use super::users::Entity as Users;
