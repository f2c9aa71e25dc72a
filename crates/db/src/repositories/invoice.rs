//! Invoice repository.
//!
//! Every item mutation runs in a transaction holding a `FOR UPDATE` lock on
//! the invoice row and ends with a full recomputation of the stored totals
//! from the current items. Invoice creation locks the business row while the
//! next number is allocated.

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use factura_core::invoice::{
    InvoiceError, InvoiceLifecycle, InvoiceTransition, LineItemInput, compute_totals,
    line_amount, next_number, totals_for_items, validate_item, validate_items,
    validate_tax_rate, year_prefix,
};
use factura_shared::types::PageRequest;

use crate::entities::{businesses, clients, invoice_items, invoices, sea_orm_active_enums::InvoiceStatus};

use super::is_unique_violation;

/// Error types for invoice persistence.
#[derive(Debug, thiserror::Error)]
pub enum InvoiceRepoError {
    /// Invoice does not exist in this business.
    #[error("Invoice not found")]
    NotFound,

    /// Line item does not exist on this invoice.
    #[error("Invoice item not found")]
    ItemNotFound,

    /// Client does not exist in this business.
    #[error("Client not found")]
    ClientNotFound,

    /// Business does not exist.
    #[error("Business not found")]
    BusinessNotFound,

    /// Number already used in this business.
    #[error("Invoice number {0} already exists")]
    DuplicateNumber(String),

    /// Invoice rule violation.
    #[error(transparent)]
    Rule(#[from] InvoiceError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoiceInput {
    /// Billed client, must belong to the business.
    pub client_id: Uuid,
    /// Explicit number; allocated when absent.
    pub invoice_number: Option<String>,
    /// Issue date.
    pub date: NaiveDate,
    /// Due date.
    pub due_date: NaiveDate,
    /// Tax percentage.
    pub tax_rate: Option<Decimal>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// At least one line.
    pub items: Vec<LineItemInput>,
}

/// Input for updating a draft invoice.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoiceInput {
    /// New client.
    pub client_id: Option<Uuid>,
    /// New issue date.
    pub date: Option<NaiveDate>,
    /// New due date.
    pub due_date: Option<NaiveDate>,
    /// New tax percentage; the stored one is kept when absent.
    pub tax_rate: Option<Decimal>,
    /// New notes.
    pub notes: Option<String>,
    /// Replacement for the whole item list.
    pub items: Option<Vec<LineItemInput>>,
}

/// Partial change to a single line.
#[derive(Debug, Clone, Default)]
pub struct UpdateItemInput {
    /// New description.
    pub description: Option<String>,
    /// New quantity.
    pub quantity: Option<Decimal>,
    /// New unit price.
    pub unit_price: Option<Decimal>,
}

/// List filters.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    /// Only this status.
    pub status: Option<InvoiceStatus>,
    /// Only this client.
    pub client_id: Option<Uuid>,
}

/// An invoice with its lines and client.
#[derive(Debug, Clone)]
pub struct InvoiceWithItems {
    /// The invoice.
    pub invoice: invoices::Model,
    /// Lines in insertion order.
    pub items: Vec<invoice_items::Model>,
    /// The billed client.
    pub client: Option<clients::Model>,
}

/// Invoice repository.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    db: DatabaseConnection,
}

impl InvoiceRepository {
    /// Creates a new invoice repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a DRAFT invoice with its items.
    ///
    /// # Errors
    ///
    /// Returns a rule error for invalid items or tax rate, `ClientNotFound`
    /// if the client is not in the business, or `DuplicateNumber`.
    pub async fn create(
        &self,
        business_id: Uuid,
        input: CreateInvoiceInput,
    ) -> Result<InvoiceWithItems, InvoiceRepoError> {
        validate_items(&input.items)?;
        if let Some(rate) = input.tax_rate {
            validate_tax_rate(rate)?;
        }

        let txn = self.db.begin().await?;

        businesses::Entity::find_by_id(business_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(InvoiceRepoError::BusinessNotFound)?;

        let client = Self::client_in_business(&txn, business_id, input.client_id).await?;

        let invoice_number = match input.invoice_number.filter(|n| !n.trim().is_empty()) {
            Some(number) => number,
            None => Self::allocate_number(&txn, business_id, Utc::now().year()).await?,
        };

        let totals = totals_for_items(&input.items, input.tax_rate);
        let now = Utc::now().into();

        let invoice = invoices::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(business_id),
            client_id: Set(client.id),
            invoice_number: Set(invoice_number.clone()),
            date: Set(input.date),
            due_date: Set(input.due_date),
            status: Set(InvoiceStatus::Draft),
            subtotal: Set(totals.subtotal),
            tax_rate: Set(input.tax_rate),
            tax: Set(totals.tax),
            total: Set(totals.total),
            notes: Set(input.notes),
            pdf_url: Set(None),
            paid_at: Set(None),
            payment_method: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                InvoiceRepoError::DuplicateNumber(invoice_number)
            } else {
                InvoiceRepoError::Database(e)
            }
        })?;

        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            items.push(Self::insert_item(&txn, invoice.id, item).await?);
        }

        txn.commit().await?;

        Ok(InvoiceWithItems {
            invoice,
            items,
            client: Some(client),
        })
    }

    /// Lists invoices of a business, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        business_id: Uuid,
        filter: &InvoiceFilter,
        page: &PageRequest,
    ) -> Result<(Vec<invoices::Model>, u64), DbErr> {
        let mut query = invoices::Entity::find().filter(invoices::Column::BusinessId.eq(business_id));
        if let Some(status) = filter.status {
            query = query.filter(invoices::Column::Status.eq(status));
        }
        if let Some(client_id) = filter.client_id {
            query = query.filter(invoices::Column::ClientId.eq(client_id));
        }

        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_desc(invoices::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok((items, total))
    }

    /// Gets an invoice row of a business.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such invoice exists in the business.
    pub async fn find(&self, business_id: Uuid, id: Uuid) -> Result<invoices::Model, InvoiceRepoError> {
        invoices::Entity::find_by_id(id)
            .filter(invoices::Column::BusinessId.eq(business_id))
            .one(&self.db)
            .await?
            .ok_or(InvoiceRepoError::NotFound)
    }

    /// Gets an invoice with its items and client.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such invoice exists in the business.
    pub async fn get(&self, business_id: Uuid, id: Uuid) -> Result<InvoiceWithItems, InvoiceRepoError> {
        let invoice = self.find(business_id, id).await?;
        Ok(Self::load_details(&self.db, invoice).await?)
    }

    /// Updates a DRAFT invoice, replacing its items when given.
    ///
    /// # Errors
    ///
    /// Returns `Rule(NotDraft)` outside DRAFT, or a validation rule error.
    pub async fn update(
        &self,
        business_id: Uuid,
        id: Uuid,
        input: UpdateInvoiceInput,
    ) -> Result<InvoiceWithItems, InvoiceRepoError> {
        if let Some(items) = &input.items {
            validate_items(items)?;
        }
        if let Some(rate) = input.tax_rate {
            validate_tax_rate(rate)?;
        }

        let txn = self.db.begin().await?;
        let invoice = Self::lock(&txn, business_id, id).await?;
        InvoiceLifecycle::ensure_editable(invoice.status.into(), "update")?;

        if let Some(client_id) = input.client_id {
            Self::client_in_business(&txn, business_id, client_id).await?;
        }

        if let Some(items) = &input.items {
            invoice_items::Entity::delete_many()
                .filter(invoice_items::Column::InvoiceId.eq(invoice.id))
                .exec(&txn)
                .await?;
            for item in items {
                Self::insert_item(&txn, invoice.id, item).await?;
            }
        }

        let tax_rate = input.tax_rate.or(invoice.tax_rate);
        let mut active: invoices::ActiveModel = invoice.into();
        if let Some(client_id) = input.client_id {
            active.client_id = Set(client_id);
        }
        if let Some(date) = input.date {
            active.date = Set(date);
        }
        if let Some(due_date) = input.due_date {
            active.due_date = Set(due_date);
        }
        if let Some(notes) = input.notes {
            active.notes = Set(Some(notes));
        }
        let invoice = active.update(&txn).await?;

        let invoice = Self::recalculate(&txn, invoice, tax_rate).await?;
        let details = Self::load_details(&txn, invoice).await?;
        txn.commit().await?;

        Ok(details)
    }

    /// Deletes a DRAFT invoice.
    ///
    /// # Errors
    ///
    /// Returns `Rule(NotDraft)` outside DRAFT.
    pub async fn delete(&self, business_id: Uuid, id: Uuid) -> Result<invoices::Model, InvoiceRepoError> {
        let txn = self.db.begin().await?;
        let invoice = Self::lock(&txn, business_id, id).await?;
        InvoiceLifecycle::ensure_editable(invoice.status.into(), "delete")?;

        invoices::Entity::delete_by_id(invoice.id).exec(&txn).await?;
        txn.commit().await?;

        Ok(invoice)
    }

    /// Adds a line to a DRAFT invoice.
    ///
    /// # Errors
    ///
    /// Returns `Rule(NotDraft)` outside DRAFT, or a validation rule error.
    pub async fn add_item(
        &self,
        business_id: Uuid,
        invoice_id: Uuid,
        item: LineItemInput,
    ) -> Result<InvoiceWithItems, InvoiceRepoError> {
        validate_item(&item)?;

        let txn = self.db.begin().await?;
        let invoice = Self::lock(&txn, business_id, invoice_id).await?;
        InvoiceLifecycle::ensure_editable(invoice.status.into(), "add items to")?;

        Self::insert_item(&txn, invoice.id, &item).await?;

        let tax_rate = invoice.tax_rate;
        let invoice = Self::recalculate(&txn, invoice, tax_rate).await?;
        let details = Self::load_details(&txn, invoice).await?;
        txn.commit().await?;

        Ok(details)
    }

    /// Changes a line of a DRAFT invoice.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound`, `Rule(NotDraft)` or a validation rule error.
    pub async fn update_item(
        &self,
        business_id: Uuid,
        invoice_id: Uuid,
        item_id: Uuid,
        input: UpdateItemInput,
    ) -> Result<InvoiceWithItems, InvoiceRepoError> {
        let txn = self.db.begin().await?;
        let invoice = Self::lock(&txn, business_id, invoice_id).await?;
        InvoiceLifecycle::ensure_editable(invoice.status.into(), "update items of")?;

        let existing = Self::item_of(&txn, invoice.id, item_id).await?;
        let merged = LineItemInput {
            description: input.description.unwrap_or_else(|| existing.description.clone()),
            quantity: input.quantity.unwrap_or(existing.quantity),
            unit_price: input.unit_price.unwrap_or(existing.unit_price),
        };
        validate_item(&merged)?;

        let mut active: invoice_items::ActiveModel = existing.into();
        active.amount = Set(line_amount(merged.quantity, merged.unit_price));
        active.description = Set(merged.description);
        active.quantity = Set(merged.quantity);
        active.unit_price = Set(merged.unit_price);
        active.update(&txn).await?;

        let tax_rate = invoice.tax_rate;
        let invoice = Self::recalculate(&txn, invoice, tax_rate).await?;
        let details = Self::load_details(&txn, invoice).await?;
        txn.commit().await?;

        Ok(details)
    }

    /// Removes a line from a DRAFT invoice. The last line cannot be removed.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound`, `Rule(NotDraft)` or `Rule(NoItems)`.
    pub async fn delete_item(
        &self,
        business_id: Uuid,
        invoice_id: Uuid,
        item_id: Uuid,
    ) -> Result<InvoiceWithItems, InvoiceRepoError> {
        let txn = self.db.begin().await?;
        let invoice = Self::lock(&txn, business_id, invoice_id).await?;
        InvoiceLifecycle::ensure_editable(invoice.status.into(), "remove items from")?;

        let item = Self::item_of(&txn, invoice.id, item_id).await?;
        let remaining = invoice_items::Entity::find()
            .filter(invoice_items::Column::InvoiceId.eq(invoice.id))
            .count(&txn)
            .await?;
        if remaining <= 1 {
            return Err(InvoiceError::NoItems.into());
        }

        invoice_items::Entity::delete_by_id(item.id).exec(&txn).await?;

        let tax_rate = invoice.tax_rate;
        let invoice = Self::recalculate(&txn, invoice, tax_rate).await?;
        let details = Self::load_details(&txn, invoice).await?;
        txn.commit().await?;

        Ok(details)
    }

    /// Applies a lifecycle operation under a row lock.
    ///
    /// `decide` sees the locked row and returns the transition to persist.
    ///
    /// # Errors
    ///
    /// Returns whatever `decide` rejects with, wrapped in `Rule`.
    pub async fn transition<F>(
        &self,
        business_id: Uuid,
        id: Uuid,
        decide: F,
    ) -> Result<invoices::Model, InvoiceRepoError>
    where
        F: FnOnce(&invoices::Model) -> Result<InvoiceTransition, InvoiceError> + Send,
    {
        let txn = self.db.begin().await?;
        let invoice = Self::lock(&txn, business_id, id).await?;
        let transition = decide(&invoice)?;

        let mut active: invoices::ActiveModel = invoice.into();
        active.status = Set(transition.new_status().into());
        match transition {
            InvoiceTransition::MarkPaid {
                paid_on,
                payment_method,
                ..
            } => {
                active.paid_at = Set(Some(paid_on));
                active.payment_method = Set(payment_method);
            }
            InvoiceTransition::Cancel { notes, .. } => {
                active.notes = Set(notes);
            }
            InvoiceTransition::Send { .. } | InvoiceTransition::MarkOverdue { .. } => {}
        }
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Records the storage key of the rendered PDF.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such invoice exists in the business.
    pub async fn set_pdf_url(
        &self,
        business_id: Uuid,
        id: Uuid,
        pdf_url: Option<String>,
    ) -> Result<invoices::Model, InvoiceRepoError> {
        let invoice = self.find(business_id, id).await?;
        let mut active: invoices::ActiveModel = invoice.into();
        active.pdf_url = Set(pdf_url);
        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&self.db).await?)
    }

    /// Next `INV-<year>-<seq>` for the business: one past the highest
    /// sequence already issued that year.
    async fn allocate_number<C>(conn: &C, business_id: Uuid, year: i32) -> Result<String, DbErr>
    where
        C: ConnectionTrait,
    {
        let existing: Vec<String> = invoices::Entity::find()
            .select_only()
            .column(invoices::Column::InvoiceNumber)
            .filter(invoices::Column::BusinessId.eq(business_id))
            .filter(invoices::Column::InvoiceNumber.starts_with(year_prefix(year)))
            .into_tuple()
            .all(conn)
            .await?;

        Ok(next_number(existing.iter().map(String::as_str), year))
    }

    async fn lock<C>(conn: &C, business_id: Uuid, id: Uuid) -> Result<invoices::Model, InvoiceRepoError>
    where
        C: ConnectionTrait,
    {
        invoices::Entity::find_by_id(id)
            .filter(invoices::Column::BusinessId.eq(business_id))
            .lock_exclusive()
            .one(conn)
            .await?
            .ok_or(InvoiceRepoError::NotFound)
    }

    async fn client_in_business<C>(
        conn: &C,
        business_id: Uuid,
        client_id: Uuid,
    ) -> Result<clients::Model, InvoiceRepoError>
    where
        C: ConnectionTrait,
    {
        clients::Entity::find_by_id(client_id)
            .filter(clients::Column::BusinessId.eq(business_id))
            .one(conn)
            .await?
            .ok_or(InvoiceRepoError::ClientNotFound)
    }

    async fn item_of<C>(
        conn: &C,
        invoice_id: Uuid,
        item_id: Uuid,
    ) -> Result<invoice_items::Model, InvoiceRepoError>
    where
        C: ConnectionTrait,
    {
        invoice_items::Entity::find_by_id(item_id)
            .filter(invoice_items::Column::InvoiceId.eq(invoice_id))
            .one(conn)
            .await?
            .ok_or(InvoiceRepoError::ItemNotFound)
    }

    async fn insert_item<C>(
        conn: &C,
        invoice_id: Uuid,
        item: &LineItemInput,
    ) -> Result<invoice_items::Model, DbErr>
    where
        C: ConnectionTrait,
    {
        invoice_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            invoice_id: Set(invoice_id),
            description: Set(item.description.trim().to_string()),
            quantity: Set(item.quantity),
            unit_price: Set(item.unit_price),
            amount: Set(line_amount(item.quantity, item.unit_price)),
            created_at: Set(Utc::now().into()),
        }
        .insert(conn)
        .await
    }

    /// Recomputes and stores totals from every current item.
    async fn recalculate<C>(
        conn: &C,
        invoice: invoices::Model,
        tax_rate: Option<Decimal>,
    ) -> Result<invoices::Model, DbErr>
    where
        C: ConnectionTrait,
    {
        let amounts: Vec<Decimal> = invoice_items::Entity::find()
            .select_only()
            .column(invoice_items::Column::Amount)
            .filter(invoice_items::Column::InvoiceId.eq(invoice.id))
            .into_tuple()
            .all(conn)
            .await?;

        let totals = compute_totals(amounts, tax_rate);

        let mut active: invoices::ActiveModel = invoice.into();
        active.subtotal = Set(totals.subtotal);
        active.tax_rate = Set(tax_rate);
        active.tax = Set(totals.tax);
        active.total = Set(totals.total);
        active.updated_at = Set(Utc::now().into());
        active.update(conn).await
    }

    async fn load_details<C>(conn: &C, invoice: invoices::Model) -> Result<InvoiceWithItems, DbErr>
    where
        C: ConnectionTrait,
    {
        let items = invoice_items::Entity::find()
            .filter(invoice_items::Column::InvoiceId.eq(invoice.id))
            .order_by_asc(invoice_items::Column::CreatedAt)
            .order_by_asc(invoice_items::Column::Id)
            .all(conn)
            .await?;
        let client = clients::Entity::find_by_id(invoice.client_id).one(conn).await?;

        Ok(InvoiceWithItems {
            invoice,
            items,
            client,
        })
    }
}
