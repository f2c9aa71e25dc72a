//! Business and business settings repository.
//!
//! Every business has exactly one settings row, inserted in the same
//! transaction as the business.

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use factura_core::business::{DEFAULT_INVOICE_PREFIX, DEFAULT_PAYMENT_TERMS};
use factura_shared::types::PageRequest;

use crate::entities::{business_settings, businesses};

/// Error types for business operations.
#[derive(Debug, thiserror::Error)]
pub enum BusinessError {
    /// Business does not exist.
    #[error("Business not found")]
    NotFound,

    /// Settings row is missing.
    #[error("Business settings not found")]
    SettingsNotFound,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a business.
#[derive(Debug, Clone)]
pub struct CreateBusinessInput {
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Business name.
    pub name: String,
    /// Logo URL.
    pub logo: Option<String>,
    /// Matricule Fiscal, already validated.
    pub tax_id: Option<String>,
    /// Upper-case currency code.
    pub currency: String,
    /// Default tax rate percentage.
    pub tax_rate: Option<Decimal>,
    /// Address object.
    pub address: Option<serde_json::Value>,
}

/// Input for updating a business. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateBusinessInput {
    /// Business name.
    pub name: Option<String>,
    /// Logo URL.
    pub logo: Option<String>,
    /// Matricule Fiscal.
    pub tax_id: Option<String>,
    /// Currency code.
    pub currency: Option<String>,
    /// Default tax rate.
    pub tax_rate: Option<Decimal>,
    /// Address object.
    pub address: Option<serde_json::Value>,
}

/// Input for updating business settings.
#[derive(Debug, Clone, Default)]
pub struct UpdateSettingsInput {
    /// Tax rate override.
    pub tax_rate: Option<Decimal>,
    /// Invoice number prefix.
    pub invoice_prefix: Option<String>,
    /// Payment terms in days.
    pub payment_terms: Option<i32>,
    /// Template configuration.
    pub invoice_template: Option<serde_json::Value>,
    /// Anything else.
    pub other_settings: Option<serde_json::Value>,
}

/// Business repository.
#[derive(Debug, Clone)]
pub struct BusinessRepository {
    db: DatabaseConnection,
}

impl BusinessRepository {
    /// Creates a new business repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a business and its default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if either insert fails; nothing is kept in that case.
    pub async fn create(&self, input: CreateBusinessInput) -> Result<businesses::Model, DbErr> {
        let txn = self.db.begin().await?;
        let business = Self::insert_with_settings(&txn, input).await?;
        txn.commit().await?;
        Ok(business)
    }

    pub(crate) async fn insert_with_settings<C>(
        conn: &C,
        input: CreateBusinessInput,
    ) -> Result<businesses::Model, DbErr>
    where
        C: sea_orm::ConnectionTrait,
    {
        let now = chrono::Utc::now().into();

        let business = businesses::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(input.tenant_id),
            name: Set(input.name),
            logo: Set(input.logo),
            tax_id: Set(input.tax_id),
            currency: Set(input.currency),
            tax_rate: Set(input.tax_rate),
            address: Set(input.address),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await?;

        business_settings::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(business.id),
            tax_rate: Set(None),
            invoice_prefix: Set(DEFAULT_INVOICE_PREFIX.to_string()),
            payment_terms: Set(DEFAULT_PAYMENT_TERMS),
            invoice_template: Set(None),
            other_settings: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await?;

        Ok(business)
    }

    /// Lists businesses, newest first, optionally restricted to one tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        tenant_id: Option<Uuid>,
        page: &PageRequest,
    ) -> Result<(Vec<businesses::Model>, u64), DbErr> {
        let mut query = businesses::Entity::find();
        if let Some(tenant_id) = tenant_id {
            query = query.filter(businesses::Column::TenantId.eq(tenant_id));
        }

        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_desc(businesses::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok((items, total))
    }

    /// Gets a business by ID.
    ///
    /// # Errors
    ///
    /// Returns `BusinessError::NotFound` if the business does not exist.
    pub async fn get(&self, id: Uuid) -> Result<businesses::Model, BusinessError> {
        businesses::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(BusinessError::NotFound)
    }

    /// Updates a business.
    ///
    /// # Errors
    ///
    /// Returns `BusinessError::NotFound` if the business does not exist.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateBusinessInput,
    ) -> Result<businesses::Model, BusinessError> {
        let business = self.get(id).await?;
        let mut active: businesses::ActiveModel = business.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(logo) = input.logo {
            active.logo = Set(Some(logo));
        }
        if let Some(tax_id) = input.tax_id {
            active.tax_id = Set(Some(tax_id));
        }
        if let Some(currency) = input.currency {
            active.currency = Set(currency);
        }
        if let Some(rate) = input.tax_rate {
            active.tax_rate = Set(Some(rate));
        }
        if let Some(address) = input.address {
            active.address = Set(Some(address));
        }
        active.updated_at = Set(chrono::Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    /// Deletes a business and everything it owns.
    ///
    /// # Errors
    ///
    /// Returns `BusinessError::NotFound` if nothing was deleted.
    pub async fn delete(&self, id: Uuid) -> Result<(), BusinessError> {
        let result = businesses::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(BusinessError::NotFound);
        }
        Ok(())
    }

    /// Gets the settings of a business.
    ///
    /// # Errors
    ///
    /// Returns `BusinessError::SettingsNotFound` if the row is missing.
    pub async fn get_settings(
        &self,
        business_id: Uuid,
    ) -> Result<business_settings::Model, BusinessError> {
        business_settings::Entity::find()
            .filter(business_settings::Column::BusinessId.eq(business_id))
            .one(&self.db)
            .await?
            .ok_or(BusinessError::SettingsNotFound)
    }

    /// Updates the settings of a business.
    ///
    /// # Errors
    ///
    /// Returns `BusinessError::SettingsNotFound` if the row is missing.
    pub async fn update_settings(
        &self,
        business_id: Uuid,
        input: UpdateSettingsInput,
    ) -> Result<business_settings::Model, BusinessError> {
        let settings = self.get_settings(business_id).await?;
        let mut active: business_settings::ActiveModel = settings.into();

        if let Some(rate) = input.tax_rate {
            active.tax_rate = Set(Some(rate));
        }
        if let Some(prefix) = input.invoice_prefix {
            active.invoice_prefix = Set(prefix);
        }
        if let Some(terms) = input.payment_terms {
            active.payment_terms = Set(terms);
        }
        if let Some(template) = input.invoice_template {
            active.invoice_template = Set(Some(template));
        }
        if let Some(other) = input.other_settings {
            active.other_settings = Set(Some(other));
        }
        active.updated_at = Set(chrono::Utc::now().into());

        Ok(active.update(&self.db).await?)
    }
}
