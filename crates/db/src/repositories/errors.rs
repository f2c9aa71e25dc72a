//! Conversions from repository errors into the shared `AppError`.

use sea_orm::DbErr;

use factura_shared::AppError;

use super::{
    BusinessError, ClientError, ExpenseCategoryError, ExpenseRepoError, InvoiceRepoError,
    RecurringError, RegistrationError, TaxRateError, TenantError, UserError, UserTokenError,
    is_unique_violation,
};

/// Maps a raw database error: unique violations become conflicts.
#[must_use]
pub fn database_error(err: &DbErr) -> AppError {
    if is_unique_violation(err) {
        AppError::Conflict("Resource already exists".to_string())
    } else {
        AppError::Database(err.to_string())
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match &err {
            UserError::NotFound => Self::NotFound(err.to_string()),
            UserError::EmailInUse => Self::Conflict(err.to_string()),
            UserError::Database(e) => database_error(e),
        }
    }
}

impl From<TenantError> for AppError {
    fn from(err: TenantError) -> Self {
        match &err {
            TenantError::NotFound | TenantError::NoOwnedTenant => Self::NotFound(err.to_string()),
            TenantError::Database(e) => database_error(e),
        }
    }
}

impl From<RegistrationError> for AppError {
    fn from(err: RegistrationError) -> Self {
        match &err {
            RegistrationError::EmailTaken => Self::Conflict(err.to_string()),
            RegistrationError::Database(e) => database_error(e),
        }
    }
}

impl From<UserTokenError> for AppError {
    fn from(err: UserTokenError) -> Self {
        match &err {
            UserTokenError::InvalidToken => Self::Validation(err.to_string()),
            UserTokenError::UserNotFound => Self::NotFound(err.to_string()),
            UserTokenError::Database(e) => database_error(e),
        }
    }
}

impl From<BusinessError> for AppError {
    fn from(err: BusinessError) -> Self {
        match &err {
            BusinessError::NotFound | BusinessError::SettingsNotFound => {
                Self::NotFound(err.to_string())
            }
            BusinessError::Database(e) => database_error(e),
        }
    }
}

impl From<TaxRateError> for AppError {
    fn from(err: TaxRateError) -> Self {
        match &err {
            TaxRateError::NotFound => Self::NotFound(err.to_string()),
            TaxRateError::DefaultTaken => Self::Conflict(err.to_string()),
            TaxRateError::Database(e) => database_error(e),
        }
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        match &err {
            ClientError::NotFound => Self::NotFound(err.to_string()),
            ClientError::CorruptHistory => Self::Internal(err.to_string()),
            ClientError::Database(e) => database_error(e),
        }
    }
}

impl From<InvoiceRepoError> for AppError {
    fn from(err: InvoiceRepoError) -> Self {
        match err {
            e @ (InvoiceRepoError::NotFound
            | InvoiceRepoError::ItemNotFound
            | InvoiceRepoError::ClientNotFound
            | InvoiceRepoError::BusinessNotFound) => Self::NotFound(e.to_string()),
            e @ InvoiceRepoError::DuplicateNumber(_) => Self::Conflict(e.to_string()),
            InvoiceRepoError::Rule(rule) => rule.into(),
            InvoiceRepoError::Database(e) => database_error(&e),
        }
    }
}

impl From<RecurringError> for AppError {
    fn from(err: RecurringError) -> Self {
        match err {
            e @ (RecurringError::NotFound | RecurringError::InvoiceNotFound) => {
                Self::NotFound(e.to_string())
            }
            RecurringError::Rule(rule) => rule.into(),
            RecurringError::Database(e) => database_error(&e),
        }
    }
}

impl From<ExpenseRepoError> for AppError {
    fn from(err: ExpenseRepoError) -> Self {
        match err {
            e @ (ExpenseRepoError::NotFound | ExpenseRepoError::CategoryNotFound) => {
                Self::NotFound(e.to_string())
            }
            ExpenseRepoError::Rule(rule) => rule.into(),
            ExpenseRepoError::Database(e) => database_error(&e),
        }
    }
}

impl From<ExpenseCategoryError> for AppError {
    fn from(err: ExpenseCategoryError) -> Self {
        match &err {
            ExpenseCategoryError::NotFound => Self::NotFound(err.to_string()),
            ExpenseCategoryError::Database(e) => database_error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factura_core::expense::ExpenseError;
    use factura_core::invoice::{InvoiceError, InvoiceStatus};

    #[test]
    fn test_not_found_messages_survive() {
        let err: AppError = InvoiceRepoError::NotFound.into();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.message(), "Invoice not found");

        let err: AppError = TenantError::NoOwnedTenant.into();
        assert_eq!(err.message(), "You do not own any tenant");
    }

    #[test]
    fn test_rule_errors_keep_their_mapping() {
        let err: AppError = InvoiceRepoError::Rule(InvoiceError::NotDraft {
            operation: "update",
            status: InvoiceStatus::Sent,
        })
        .into();
        assert_eq!(err.status_code(), 400);

        let err: AppError = ExpenseRepoError::Rule(ExpenseError::NotOwnerSubmit).into();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_conflicts() {
        let err: AppError = RegistrationError::EmailTaken.into();
        assert_eq!(err.status_code(), 409);
        let err: AppError = InvoiceRepoError::DuplicateNumber("INV-2026-001".into()).into();
        assert_eq!(err.status_code(), 409);
        let err: AppError = TaxRateError::DefaultTaken.into();
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.message(), "Another tax rate is already the default");
    }

    #[test]
    fn test_plain_database_error_is_server_error() {
        let err = database_error(&DbErr::Custom("boom".into()));
        assert!(err.is_server_error());
    }
}
