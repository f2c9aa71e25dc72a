//! Self-service signup.
//!
//! Creates the owner account, its tenant, a first business with settings and
//! an initial tax rate in one transaction. Any failure rolls everything back.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use crate::entities::{businesses, sea_orm_active_enums::UserRole, tax_rates, tenants, users};

use super::{
    BusinessRepository, CreateBusinessInput, CreateTaxRateInput, CreateTenantInput,
    TaxRateRepository, TenantRepository, is_unique_violation,
};

/// Error types for registration.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// An account already uses the email.
    #[error("Email already registered")]
    EmailTaken,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Everything needed to sign up.
#[derive(Debug, Clone)]
pub struct RegistrationInput {
    /// Owner email.
    pub email: String,
    /// Argon2 hash of the owner password.
    pub password_hash: String,
    /// Owner display name.
    pub name: String,
    /// Owner phone number.
    pub phone_number: Option<String>,
    /// Tenant to create; `owner_id` is filled in here.
    pub tenant: CreateTenantInput,
    /// First business; `tenant_id` is filled in here.
    pub business: CreateBusinessInput,
    /// Initial tax rate of the business.
    pub tax_rate: CreateTaxRateInput,
}

/// Records created by a registration.
#[derive(Debug, Clone)]
pub struct Registered {
    /// The new owner.
    pub user: users::Model,
    /// The owner's tenant.
    pub tenant: tenants::Model,
    /// The first business.
    pub business: businesses::Model,
    /// The initial tax rate.
    pub tax_rate: tax_rates::Model,
}

/// Registration repository.
#[derive(Debug, Clone)]
pub struct RegistrationRepository {
    db: DatabaseConnection,
}

impl RegistrationRepository {
    /// Creates a new registration repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Registers a business owner.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::EmailTaken` if the email is in use.
    pub async fn register(&self, input: RegistrationInput) -> Result<Registered, RegistrationError> {
        let txn = self.db.begin().await?;

        let taken = users::Entity::find()
            .filter(users::Column::Email.eq(&input.email))
            .count(&txn)
            .await?;
        if taken > 0 {
            txn.rollback().await?;
            return Err(RegistrationError::EmailTaken);
        }

        let now = chrono::Utc::now().into();
        let user = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(input.email),
            password_hash: Set(input.password_hash),
            name: Set(input.name),
            phone_number: Set(input.phone_number),
            role: Set(UserRole::BusinessOwner),
            is_verified: Set(false),
            is_suspended: Set(false),
            tenant_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RegistrationError::EmailTaken
            } else {
                RegistrationError::Database(e)
            }
        })?;

        let tenant = TenantRepository::insert(
            &txn,
            CreateTenantInput {
                owner_id: Some(user.id),
                ..input.tenant
            },
        )
        .await?;

        let mut active: users::ActiveModel = user.into();
        active.tenant_id = Set(Some(tenant.id));
        let user = active.update(&txn).await?;

        let business = BusinessRepository::insert_with_settings(
            &txn,
            CreateBusinessInput {
                tenant_id: tenant.id,
                ..input.business
            },
        )
        .await?;

        let tax_rate = TaxRateRepository::insert(&txn, business.id, input.tax_rate).await?;

        txn.commit().await?;

        info!(
            user_id = %user.id,
            tenant_id = %tenant.id,
            business_id = %business.id,
            "Registered business owner"
        );

        Ok(Registered {
            user,
            tenant,
            business,
            tax_rate,
        })
    }
}
