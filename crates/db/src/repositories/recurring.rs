//! Recurring invoice schedules.
//!
//! Only schedule metadata is kept; nothing here generates invoices.

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use uuid::Uuid;

use factura_core::invoice::{InvoiceError, next_generation_date, validate_schedule};
use factura_shared::types::PageRequest;

use crate::entities::{invoices, recurring_invoices, sea_orm_active_enums::RecurringFrequency};

/// Error types for recurring schedule operations.
#[derive(Debug, thiserror::Error)]
pub enum RecurringError {
    /// Schedule does not exist in this business.
    #[error("Recurring invoice not found")]
    NotFound,

    /// Template invoice does not exist in this business.
    #[error("Invoice not found")]
    InvoiceNotFound,

    /// Schedule rule violation.
    #[error(transparent)]
    Rule(#[from] InvoiceError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a schedule.
#[derive(Debug, Clone)]
pub struct CreateRecurringInput {
    /// Regeneration frequency.
    pub frequency: RecurringFrequency,
    /// First date of the schedule.
    pub start_date: NaiveDate,
    /// Last date the schedule may generate on.
    pub end_date: Option<NaiveDate>,
}

/// Input for updating a schedule.
#[derive(Debug, Clone, Default)]
pub struct UpdateRecurringInput {
    /// New frequency.
    pub frequency: Option<RecurringFrequency>,
    /// New start date.
    pub start_date: Option<NaiveDate>,
    /// New end date.
    pub end_date: Option<NaiveDate>,
    /// Reactivate or pause.
    pub is_active: Option<bool>,
}

/// Recurring schedule repository.
#[derive(Debug, Clone)]
pub struct RecurringInvoiceRepository {
    db: DatabaseConnection,
}

impl RecurringInvoiceRepository {
    /// Creates a new recurring invoice repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a schedule for a template invoice of the business.
    ///
    /// # Errors
    ///
    /// Returns `InvoiceNotFound`, or a rule error for an inverted range.
    pub async fn create(
        &self,
        business_id: Uuid,
        invoice_id: Uuid,
        input: CreateRecurringInput,
    ) -> Result<recurring_invoices::Model, RecurringError> {
        validate_schedule(input.start_date, input.end_date)?;

        let template = invoices::Entity::find_by_id(invoice_id)
            .filter(invoices::Column::BusinessId.eq(business_id))
            .one(&self.db)
            .await?
            .ok_or(RecurringError::InvoiceNotFound)?;

        let next = next_generation_date(input.start_date, input.frequency.into(), input.end_date)?;
        let now = chrono::Utc::now().into();

        Ok(recurring_invoices::ActiveModel {
            id: Set(Uuid::new_v4()),
            invoice_id: Set(template.id),
            frequency: Set(input.frequency),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            next_generation_date: Set(next),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?)
    }

    /// Lists active schedules of a business, soonest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        business_id: Uuid,
        page: &PageRequest,
    ) -> Result<(Vec<recurring_invoices::Model>, u64), DbErr> {
        let query = recurring_invoices::Entity::find()
            .join(JoinType::InnerJoin, recurring_invoices::Relation::Invoices.def())
            .filter(invoices::Column::BusinessId.eq(business_id))
            .filter(recurring_invoices::Column::IsActive.eq(true));

        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_asc(recurring_invoices::Column::NextGenerationDate)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok((items, total))
    }

    /// Gets a schedule of the business.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such schedule exists in the business.
    pub async fn get(
        &self,
        business_id: Uuid,
        id: Uuid,
    ) -> Result<recurring_invoices::Model, RecurringError> {
        recurring_invoices::Entity::find_by_id(id)
            .join(JoinType::InnerJoin, recurring_invoices::Relation::Invoices.def())
            .filter(invoices::Column::BusinessId.eq(business_id))
            .one(&self.db)
            .await?
            .ok_or(RecurringError::NotFound)
    }

    /// Updates a schedule, recomputing the next date when the frequency or
    /// any date changes.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or a rule error for an inverted range.
    pub async fn update(
        &self,
        business_id: Uuid,
        id: Uuid,
        input: UpdateRecurringInput,
    ) -> Result<recurring_invoices::Model, RecurringError> {
        let schedule = self.get(business_id, id).await?;

        let frequency = input.frequency.unwrap_or(schedule.frequency);
        let start_date = input.start_date.unwrap_or(schedule.start_date);
        let end_date = input.end_date.or(schedule.end_date);
        validate_schedule(start_date, end_date)?;

        let reschedule =
            input.frequency.is_some() || input.start_date.is_some() || input.end_date.is_some();
        let next = if reschedule {
            next_generation_date(start_date, frequency.into(), end_date)?
        } else {
            schedule.next_generation_date
        };

        let mut active: recurring_invoices::ActiveModel = schedule.into();
        active.frequency = Set(frequency);
        active.start_date = Set(start_date);
        active.end_date = Set(end_date);
        active.next_generation_date = Set(next);
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    /// Deactivates a schedule. The row is kept.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such schedule exists in the business.
    pub async fn deactivate(
        &self,
        business_id: Uuid,
        id: Uuid,
    ) -> Result<recurring_invoices::Model, RecurringError> {
        let schedule = self.get(business_id, id).await?;
        let mut active: recurring_invoices::ActiveModel = schedule.into();
        active.is_active = Set(false);
        active.updated_at = Set(chrono::Utc::now().into());
        Ok(active.update(&self.db).await?)
    }
}
