//! Tax rate repository.
//!
//! At most one rate per business is the default. Setting a new default
//! clears the previous one in the same transaction; a partial unique index
//! backs this up.

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use factura_shared::types::PageRequest;

use crate::entities::tax_rates;

use super::is_unique_violation;

/// Error types for tax rate operations.
#[derive(Debug, thiserror::Error)]
pub enum TaxRateError {
    /// Tax rate does not exist in this business.
    #[error("Tax rate not found")]
    NotFound,

    /// A concurrent write made another rate the default first.
    #[error("Another tax rate is already the default")]
    DefaultTaken,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a tax rate.
#[derive(Debug, Clone)]
pub struct CreateTaxRateInput {
    /// Display name.
    pub name: String,
    /// Percentage in `0..=100`.
    pub rate: Decimal,
    /// Whether this becomes the business default.
    pub is_default: bool,
}

/// Input for updating a tax rate.
#[derive(Debug, Clone, Default)]
pub struct UpdateTaxRateInput {
    /// Display name.
    pub name: Option<String>,
    /// Percentage.
    pub rate: Option<Decimal>,
    /// Default flag.
    pub is_default: Option<bool>,
}

/// Tax rate repository.
#[derive(Debug, Clone)]
pub struct TaxRateRepository {
    db: DatabaseConnection,
}

impl TaxRateRepository {
    /// Creates a new tax rate repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a tax rate.
    ///
    /// # Errors
    ///
    /// Returns `TaxRateError::DefaultTaken` if a concurrent write set another
    /// default first, or a database error if the insert fails.
    pub async fn create(
        &self,
        business_id: Uuid,
        input: CreateTaxRateInput,
    ) -> Result<tax_rates::Model, TaxRateError> {
        let txn = self.db.begin().await?;
        let rate = Self::insert(&txn, business_id, input)
            .await
            .map_err(write_error)?;
        txn.commit().await.map_err(write_error)?;
        Ok(rate)
    }

    pub(crate) async fn insert<C>(
        conn: &C,
        business_id: Uuid,
        input: CreateTaxRateInput,
    ) -> Result<tax_rates::Model, DbErr>
    where
        C: sea_orm::ConnectionTrait,
    {
        if input.is_default {
            Self::clear_default(conn, business_id, None).await?;
        }

        let now = chrono::Utc::now().into();
        tax_rates::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(business_id),
            name: Set(input.name),
            rate: Set(input.rate),
            is_default: Set(input.is_default),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await
    }

    /// Lists the rates of a business, default first, then newest.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        business_id: Uuid,
        page: &PageRequest,
    ) -> Result<(Vec<tax_rates::Model>, u64), DbErr> {
        let query = tax_rates::Entity::find().filter(tax_rates::Column::BusinessId.eq(business_id));
        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_desc(tax_rates::Column::IsDefault)
            .order_by_desc(tax_rates::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok((items, total))
    }

    /// Gets one rate of a business.
    ///
    /// # Errors
    ///
    /// Returns `TaxRateError::NotFound` if no such rate exists in the business.
    pub async fn get(&self, business_id: Uuid, id: Uuid) -> Result<tax_rates::Model, TaxRateError> {
        tax_rates::Entity::find_by_id(id)
            .filter(tax_rates::Column::BusinessId.eq(business_id))
            .one(&self.db)
            .await?
            .ok_or(TaxRateError::NotFound)
    }

    /// Returns the default rate of a business, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_default(&self, business_id: Uuid) -> Result<Option<tax_rates::Model>, DbErr> {
        tax_rates::Entity::find()
            .filter(tax_rates::Column::BusinessId.eq(business_id))
            .filter(tax_rates::Column::IsDefault.eq(true))
            .one(&self.db)
            .await
    }

    /// Updates a rate, clearing any other default when it becomes default.
    ///
    /// # Errors
    ///
    /// Returns `TaxRateError::NotFound` if no such rate exists in the business
    /// and `TaxRateError::DefaultTaken` if a concurrent write set another
    /// default first.
    pub async fn update(
        &self,
        business_id: Uuid,
        id: Uuid,
        input: UpdateTaxRateInput,
    ) -> Result<tax_rates::Model, TaxRateError> {
        let existing = self.get(business_id, id).await?;
        let txn = self.db.begin().await?;

        if input.is_default == Some(true) {
            Self::clear_default(&txn, business_id, Some(id)).await.map_err(write_error)?;
        }

        let mut active: tax_rates::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(rate) = input.rate {
            active.rate = Set(rate);
        }
        if let Some(is_default) = input.is_default {
            active.is_default = Set(is_default);
        }
        active.updated_at = Set(chrono::Utc::now().into());
        let updated = active.update(&txn).await.map_err(write_error)?;

        txn.commit().await.map_err(write_error)?;
        Ok(updated)
    }

    /// Deletes a rate.
    ///
    /// # Errors
    ///
    /// Returns `TaxRateError::NotFound` if no such rate exists in the business.
    pub async fn delete(&self, business_id: Uuid, id: Uuid) -> Result<(), TaxRateError> {
        let result = tax_rates::Entity::delete_many()
            .filter(tax_rates::Column::Id.eq(id))
            .filter(tax_rates::Column::BusinessId.eq(business_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(TaxRateError::NotFound);
        }
        Ok(())
    }

    async fn clear_default<C>(conn: &C, business_id: Uuid, keep: Option<Uuid>) -> Result<u64, DbErr>
    where
        C: sea_orm::ConnectionTrait,
    {
        let mut update = tax_rates::Entity::update_many()
            .col_expr(tax_rates::Column::IsDefault, sea_orm::sea_query::Expr::value(false))
            .filter(tax_rates::Column::BusinessId.eq(business_id))
            .filter(tax_rates::Column::IsDefault.eq(true));
        if let Some(keep) = keep {
            update = update.filter(tax_rates::Column::Id.ne(keep));
        }
        Ok(update.exec(conn).await?.rows_affected)
    }
}

fn write_error(err: DbErr) -> TaxRateError {
    if is_unique_violation(&err) {
        TaxRateError::DefaultTaken
    } else {
        TaxRateError::Database(err)
    }
}
