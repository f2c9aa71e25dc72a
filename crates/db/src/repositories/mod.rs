//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod business;
pub mod client;
pub mod errors;
pub mod expense;
pub mod expense_category;
pub mod invoice;
pub mod recurring;
pub mod refresh_token;
pub mod registration;
pub mod tax_rate;
pub mod tenant;
pub mod user;
pub mod user_token;

pub use business::{
    BusinessError, BusinessRepository, CreateBusinessInput, UpdateBusinessInput,
    UpdateSettingsInput,
};
pub use client::{ClientError, ClientRepository, Communication, CreateClientInput, UpdateClientInput};
pub use expense::{
    CreateExpenseInput, ExpenseFilter, ExpenseRepoError, ExpenseRepository, UpdateExpenseInput,
};
pub use expense_category::{ExpenseCategoryError, ExpenseCategoryRepository};
pub use invoice::{
    CreateInvoiceInput, InvoiceFilter, InvoiceRepoError, InvoiceRepository, InvoiceWithItems,
    UpdateInvoiceInput, UpdateItemInput,
};
pub use recurring::{
    CreateRecurringInput, RecurringError, RecurringInvoiceRepository, UpdateRecurringInput,
};
pub use refresh_token::{IssuedRefreshToken, RefreshTokenRepository};
pub use registration::{Registered, RegistrationError, RegistrationInput, RegistrationRepository};
pub use tax_rate::{CreateTaxRateInput, TaxRateError, TaxRateRepository, UpdateTaxRateInput};
pub use tenant::{CreateTenantInput, TenantError, TenantRepository, UpdateTenantInput};
pub use user::{AdminUserUpdate, ProfileUpdate, UserError, UserRepository};
pub use user_token::{UserTokenError, UserTokenRepository};

use sea_orm::{DbErr, SqlErr};
use sha2::{Digest, Sha256};

/// Hashes an opaque token for storage.
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Generates a URL-safe random token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    base64_url::encode(&bytes)
}

/// Returns true when the error is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_hex_sha256() {
        let hash = hash_token("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_generated_tokens_are_url_safe_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
