//! Expense category repository.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use factura_shared::types::PageRequest;

use crate::entities::expense_categories;

/// Error types for category operations.
#[derive(Debug, thiserror::Error)]
pub enum ExpenseCategoryError {
    /// Category does not exist in this business.
    #[error("Expense category not found")]
    NotFound,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Expense category repository.
#[derive(Debug, Clone)]
pub struct ExpenseCategoryRepository {
    db: DatabaseConnection,
}

impl ExpenseCategoryRepository {
    /// Creates a new expense category repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(
        &self,
        business_id: Uuid,
        name: String,
        description: Option<String>,
    ) -> Result<expense_categories::Model, DbErr> {
        let now = chrono::Utc::now().into();
        expense_categories::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(business_id),
            name: Set(name),
            description: Set(description),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
    }

    /// Lists categories of a business by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        business_id: Uuid,
        page: &PageRequest,
    ) -> Result<(Vec<expense_categories::Model>, u64), DbErr> {
        let query = expense_categories::Entity::find()
            .filter(expense_categories::Column::BusinessId.eq(business_id));
        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_asc(expense_categories::Column::Name)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok((items, total))
    }

    /// Gets a category of the business.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such category exists in the business.
    pub async fn get(
        &self,
        business_id: Uuid,
        id: Uuid,
    ) -> Result<expense_categories::Model, ExpenseCategoryError> {
        expense_categories::Entity::find_by_id(id)
            .filter(expense_categories::Column::BusinessId.eq(business_id))
            .one(&self.db)
            .await?
            .ok_or(ExpenseCategoryError::NotFound)
    }

    /// Renames or redescribes a category.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such category exists in the business.
    pub async fn update(
        &self,
        business_id: Uuid,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<expense_categories::Model, ExpenseCategoryError> {
        let category = self.get(business_id, id).await?;
        let mut active: expense_categories::ActiveModel = category.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(description) = description {
            active.description = Set(Some(description));
        }
        active.updated_at = Set(chrono::Utc::now().into());
        Ok(active.update(&self.db).await?)
    }

    /// Deletes a category; its expenses become uncategorised.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such category exists in the business.
    pub async fn delete(&self, business_id: Uuid, id: Uuid) -> Result<(), ExpenseCategoryError> {
        let result = expense_categories::Entity::delete_many()
            .filter(expense_categories::Column::Id.eq(id))
            .filter(expense_categories::Column::BusinessId.eq(business_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ExpenseCategoryError::NotFound);
        }
        Ok(())
    }
}
