//! Expense repository.
//!
//! Ownership and status checks come from `factura_core::expense`; workflow
//! steps are applied under a row lock so two approvers cannot both decide.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use factura_core::expense::{
    Actor, ExpenseAction, ExpenseError, ExpenseWorkflow, check_delete, check_update,
};
use factura_shared::types::PageRequest;

use crate::entities::{expense_categories, expenses, sea_orm_active_enums::ExpenseStatus};

/// Error types for expense persistence.
#[derive(Debug, thiserror::Error)]
pub enum ExpenseRepoError {
    /// Expense does not exist in this business.
    #[error("Expense not found")]
    NotFound,

    /// Category does not exist in this business.
    #[error("Expense category not found")]
    CategoryNotFound,

    /// Workflow or access rule violation.
    #[error(transparent)]
    Rule(#[from] ExpenseError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating an expense.
#[derive(Debug, Clone)]
pub struct CreateExpenseInput {
    /// Optional category of the same business.
    pub category_id: Option<Uuid>,
    /// Amount spent.
    pub amount: Decimal,
    /// When it was spent.
    pub date: NaiveDate,
    /// What it was for.
    pub description: String,
    /// Who was paid.
    pub vendor: Option<String>,
}

/// Input for updating an expense.
#[derive(Debug, Clone, Default)]
pub struct UpdateExpenseInput {
    /// New category.
    pub category_id: Option<Uuid>,
    /// New amount.
    pub amount: Option<Decimal>,
    /// New date.
    pub date: Option<NaiveDate>,
    /// New description.
    pub description: Option<String>,
    /// New vendor.
    pub vendor: Option<String>,
}

/// List filters.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    /// Visibility limit of the caller; ANDed with `user_id`.
    pub scope: Option<Uuid>,
    /// Only this submitter.
    pub user_id: Option<Uuid>,
    /// Only this status.
    pub status: Option<ExpenseStatus>,
    /// Only this category.
    pub category_id: Option<Uuid>,
}

/// Expense repository.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a DRAFT expense owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `CategoryNotFound` or `Rule(NegativeAmount)`.
    pub async fn create(
        &self,
        business_id: Uuid,
        user_id: Uuid,
        input: CreateExpenseInput,
    ) -> Result<expenses::Model, ExpenseRepoError> {
        ExpenseWorkflow::validate_amount(input.amount)?;
        if let Some(category_id) = input.category_id {
            Self::category_in_business(&self.db, business_id, category_id).await?;
        }

        let now = chrono::Utc::now().into();
        Ok(expenses::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(business_id),
            user_id: Set(user_id),
            category_id: Set(input.category_id),
            amount: Set(input.amount),
            date: Set(input.date),
            description: Set(input.description),
            vendor: Set(input.vendor),
            receipt_url: Set(None),
            status: Set(ExpenseStatus::Draft),
            approval_notes: Set(None),
            approved_by: Set(None),
            approved_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?)
    }

    /// Lists expenses of a business, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        business_id: Uuid,
        filter: &ExpenseFilter,
        page: &PageRequest,
    ) -> Result<(Vec<expenses::Model>, u64), DbErr> {
        let mut query = expenses::Entity::find().filter(expenses::Column::BusinessId.eq(business_id));
        for user_id in [filter.scope, filter.user_id].into_iter().flatten() {
            query = query.filter(expenses::Column::UserId.eq(user_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(expenses::Column::Status.eq(status));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(expenses::Column::CategoryId.eq(category_id));
        }

        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_desc(expenses::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok((items, total))
    }

    /// Gets an expense of the business.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such expense exists in the business.
    pub async fn get(&self, business_id: Uuid, id: Uuid) -> Result<expenses::Model, ExpenseRepoError> {
        Self::find_in(&self.db, business_id, id, false).await
    }

    /// Updates an expense if `actor` may edit it in its current status.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `CategoryNotFound` or an access rule error.
    pub async fn update(
        &self,
        business_id: Uuid,
        id: Uuid,
        actor: &Actor,
        input: UpdateExpenseInput,
    ) -> Result<expenses::Model, ExpenseRepoError> {
        if let Some(amount) = input.amount {
            ExpenseWorkflow::validate_amount(amount)?;
        }

        let txn = self.db.begin().await?;
        let expense = Self::find_in(&txn, business_id, id, true).await?;
        check_update(actor, expense.user_id, expense.status.into())?;

        if let Some(category_id) = input.category_id {
            Self::category_in_business(&txn, business_id, category_id).await?;
        }

        let mut active: expenses::ActiveModel = expense.into();
        if let Some(category_id) = input.category_id {
            active.category_id = Set(Some(category_id));
        }
        if let Some(amount) = input.amount {
            active.amount = Set(amount);
        }
        if let Some(date) = input.date {
            active.date = Set(date);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(vendor) = input.vendor {
            active.vendor = Set(Some(vendor));
        }
        active.updated_at = Set(chrono::Utc::now().into());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Deletes an expense if `actor` may. Returns the deleted row so the
    /// caller can discard its receipt.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or an access rule error.
    pub async fn delete(
        &self,
        business_id: Uuid,
        id: Uuid,
        actor: &Actor,
    ) -> Result<expenses::Model, ExpenseRepoError> {
        let txn = self.db.begin().await?;
        let expense = Self::find_in(&txn, business_id, id, true).await?;
        check_delete(actor, expense.user_id, expense.status.into())?;

        expenses::Entity::delete_by_id(expense.id).exec(&txn).await?;
        txn.commit().await?;

        Ok(expense)
    }

    /// Applies a workflow step under a row lock.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or whatever `decide` rejects with.
    pub async fn apply_action<F>(
        &self,
        business_id: Uuid,
        id: Uuid,
        decide: F,
    ) -> Result<expenses::Model, ExpenseRepoError>
    where
        F: FnOnce(&expenses::Model) -> Result<ExpenseAction, ExpenseError> + Send,
    {
        let txn = self.db.begin().await?;
        let expense = Self::find_in(&txn, business_id, id, true).await?;
        let action = decide(&expense)?;

        let mut active: expenses::ActiveModel = expense.into();
        active.status = Set(action.new_status().into());
        match action {
            ExpenseAction::Submit { .. } => {}
            ExpenseAction::Approve {
                approved_by,
                approved_at,
                approval_notes,
                ..
            } => {
                active.approved_by = Set(Some(approved_by));
                active.approved_at = Set(Some(approved_at.into()));
                active.approval_notes = Set(approval_notes);
            }
            ExpenseAction::Reject {
                approved_by,
                approved_at,
                approval_notes,
                ..
            } => {
                active.approved_by = Set(Some(approved_by));
                active.approved_at = Set(Some(approved_at.into()));
                active.approval_notes = Set(Some(approval_notes));
            }
        }
        active.updated_at = Set(chrono::Utc::now().into());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Replaces or clears the receipt key. Returns the updated row and the
    /// previous key, which the caller should delete from storage.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such expense exists in the business.
    pub async fn set_receipt(
        &self,
        business_id: Uuid,
        id: Uuid,
        receipt_url: Option<String>,
    ) -> Result<(expenses::Model, Option<String>), ExpenseRepoError> {
        let txn = self.db.begin().await?;
        let expense = Self::find_in(&txn, business_id, id, true).await?;
        let previous = expense.receipt_url.clone();

        let mut active: expenses::ActiveModel = expense.into();
        active.receipt_url = Set(receipt_url);
        active.updated_at = Set(chrono::Utc::now().into());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok((updated, previous))
    }

    async fn find_in<C>(
        conn: &C,
        business_id: Uuid,
        id: Uuid,
        for_update: bool,
    ) -> Result<expenses::Model, ExpenseRepoError>
    where
        C: ConnectionTrait,
    {
        let mut query = expenses::Entity::find_by_id(id)
            .filter(expenses::Column::BusinessId.eq(business_id));
        if for_update {
            query = query.lock_exclusive();
        }
        query.one(conn).await?.ok_or(ExpenseRepoError::NotFound)
    }

    async fn category_in_business<C>(
        conn: &C,
        business_id: Uuid,
        category_id: Uuid,
    ) -> Result<(), ExpenseRepoError>
    where
        C: ConnectionTrait,
    {
        let found = expense_categories::Entity::find_by_id(category_id)
            .filter(expense_categories::Column::BusinessId.eq(business_id))
            .count(conn)
            .await?;
        if found == 0 {
            return Err(ExpenseRepoError::CategoryNotFound);
        }
        Ok(())
    }
}
