//! Invoice routes: CRUD, line items, lifecycle transitions and PDF export.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::{businesses::business_for, discard_file};
use crate::{
    AppState,
    error::{ApiResult, bad_request, db_error, storage_not_configured},
    middleware::AuthUser,
};
use factura_core::{
    invoice::{InvoiceLifecycle, InvoiceStatus, LineItemInput},
    pdf::{DocumentLine, InvoiceDocument, Party, format_amount, render_invoice},
    storage::{StorageService, invoice_pdf_key},
};
use factura_db::{
    BusinessRepository, InvoiceRepository, TaxRateRepository,
    entities::{businesses, clients, invoice_items, invoices},
    repositories::{
        CreateInvoiceInput, InvoiceFilter, InvoiceWithItems, UpdateInvoiceInput, UpdateItemInput,
    },
};
use factura_shared::{
    auth::Address,
    email::InvoiceNotice,
    types::{PageRequest, PageResponse},
};

/// Creates the invoice routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/businesses/{business_id}/invoices",
            get(list_invoices).post(create_invoice),
        )
        .route(
            "/businesses/{business_id}/invoices/{id}",
            get(get_invoice).patch(update_invoice).delete(delete_invoice),
        )
        .route(
            "/businesses/{business_id}/invoices/{id}/items",
            post(add_item),
        )
        .route(
            "/businesses/{business_id}/invoices/{id}/items/{item_id}",
            patch(update_item).delete(delete_item),
        )
        .route("/businesses/{business_id}/invoices/{id}/send", post(send_invoice))
        .route(
            "/businesses/{business_id}/invoices/{id}/mark-paid",
            post(mark_paid),
        )
        .route(
            "/businesses/{business_id}/invoices/{id}/mark-overdue",
            post(mark_overdue),
        )
        .route(
            "/businesses/{business_id}/invoices/{id}/cancel",
            post(cancel_invoice),
        )
        .route("/businesses/{business_id}/invoices/{id}/pdf", get(download_pdf))
        .route(
            "/businesses/{business_id}/invoices/{id}/regenerate-pdf",
            post(regenerate_pdf),
        )
}

// ============================================================================
// Request / Response Types
// ============================================================================

/// Request body for creating an invoice.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    /// Billed client.
    pub client_id: Uuid,
    /// Explicit number; allocated when absent.
    #[validate(length(min = 1, max = 50, message = "must be between 1 and 50 characters"))]
    pub invoice_number: Option<String>,
    /// Issue date, defaults to today.
    pub date: Option<NaiveDate>,
    /// Due date, defaults to the date plus the business payment terms.
    pub due_date: Option<NaiveDate>,
    /// Tax percentage, defaults to the business default rate.
    pub tax_rate: Option<Decimal>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Invoice lines.
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<LineItemInput>,
}

/// Request body for updating a draft invoice.
#[derive(Debug, Deserialize)]
pub struct UpdateInvoiceRequest {
    /// New client.
    pub client_id: Option<Uuid>,
    /// New issue date.
    pub date: Option<NaiveDate>,
    /// New due date.
    pub due_date: Option<NaiveDate>,
    /// New tax percentage.
    pub tax_rate: Option<Decimal>,
    /// New notes.
    pub notes: Option<String>,
    /// Replaces every line when present.
    pub items: Option<Vec<LineItemInput>>,
}

/// Request body for editing a single line.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    /// New description.
    pub description: Option<String>,
    /// New quantity.
    pub quantity: Option<Decimal>,
    /// New unit price.
    pub unit_price: Option<Decimal>,
}

/// Request body for recording a payment.
#[derive(Debug, Default, Deserialize)]
pub struct MarkPaidRequest {
    /// Payment date, defaults to today.
    pub payment_date: Option<NaiveDate>,
    /// How the client paid.
    pub payment_method: Option<String>,
}

/// Request body for cancelling an invoice.
#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    /// Appended to the notes.
    pub reason: Option<String>,
}

/// Invoice list filters.
#[derive(Debug, Deserialize)]
pub struct InvoiceQuery {
    /// DRAFT, SENT, PAID, OVERDUE or CANCELLED.
    pub status: Option<String>,
    /// Only invoices of this client.
    pub client_id: Option<Uuid>,
}

/// An invoice with its lines and client.
#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    /// Invoice columns.
    #[serde(flatten)]
    pub invoice: invoices::Model,
    /// Lines in insertion order.
    pub items: Vec<invoice_items::Model>,
    /// Billed client.
    pub client: Option<clients::Model>,
}

impl From<InvoiceWithItems> for InvoiceResponse {
    fn from(details: InvoiceWithItems) -> Self {
        Self {
            invoice: details.invoice,
            items: details.items,
            client: details.client,
        }
    }
}

/// Result of a PDF regeneration.
#[derive(Debug, Serialize)]
pub struct PdfResponse {
    /// Invoice identifier.
    pub invoice_id: Uuid,
    /// Storage key of the new file.
    pub pdf_url: String,
}

// ============================================================================
// Invoice Handlers
// ============================================================================

/// POST /businesses/{business_id}/invoices
async fn create_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    Json(payload): Json<CreateInvoiceRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    let business = business_for(&state, &auth, business_id).await?;

    let date = payload.date.unwrap_or_else(|| Utc::now().date_naive());
    let due_date = match payload.due_date {
        Some(due) => due,
        None => {
            let settings = BusinessRepository::new((*state.db).clone())
                .get_settings(business_id)
                .await?;
            let terms = u64::try_from(settings.payment_terms).unwrap_or_default();
            date.checked_add_days(Days::new(terms))
                .ok_or_else(|| bad_request("Due date is out of range"))?
        }
    };
    let tax_rate = match payload.tax_rate {
        Some(rate) => Some(rate),
        None => TaxRateRepository::new((*state.db).clone())
            .find_default(business_id)
            .await
            .map_err(db_error)?
            .map(|tax| tax.rate)
            .or(business.tax_rate),
    };

    let created = InvoiceRepository::new((*state.db).clone())
        .create(
            business_id,
            CreateInvoiceInput {
                client_id: payload.client_id,
                invoice_number: payload.invoice_number,
                date,
                due_date,
                tax_rate,
                notes: payload.notes,
                items: payload.items,
            },
        )
        .await?;

    info!(
        business_id = %business_id,
        invoice_id = %created.invoice.id,
        number = %created.invoice.invoice_number,
        total = %created.invoice.total,
        "Invoice created"
    );
    Ok((StatusCode::CREATED, Json(InvoiceResponse::from(created))))
}

/// GET /businesses/{business_id}/invoices
async fn list_invoices(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    Query(query): Query<InvoiceQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;

    let status = query
        .status
        .as_deref()
        .map(|s| {
            InvoiceStatus::parse(s).ok_or_else(|| bad_request(format!("Unknown invoice status: {s}")))
        })
        .transpose()?;
    let filter = InvoiceFilter {
        status: status.map(Into::into),
        client_id: query.client_id,
    };

    let (items, total) = InvoiceRepository::new((*state.db).clone())
        .list(business_id, &filter, &page)
        .await
        .map_err(db_error)?;
    Ok(Json(PageResponse::new(items, &page, total)))
}

/// GET /businesses/{business_id}/invoices/{id}
async fn get_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let details = InvoiceRepository::new((*state.db).clone())
        .get(business_id, id)
        .await?;
    Ok(Json(InvoiceResponse::from(details)))
}

/// PATCH /businesses/{business_id}/invoices/{id}
async fn update_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateInvoiceRequest>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;

    let updated = InvoiceRepository::new((*state.db).clone())
        .update(
            business_id,
            id,
            UpdateInvoiceInput {
                client_id: payload.client_id,
                date: payload.date,
                due_date: payload.due_date,
                tax_rate: payload.tax_rate,
                notes: payload.notes,
                items: payload.items,
            },
        )
        .await?;

    info!(business_id = %business_id, invoice_id = %id, total = %updated.invoice.total, "Invoice updated");
    Ok(Json(InvoiceResponse::from(updated)))
}

/// DELETE /businesses/{business_id}/invoices/{id}
async fn delete_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let deleted = InvoiceRepository::new((*state.db).clone())
        .delete(business_id, id)
        .await?;

    if let (Some(storage), Some(key)) = (&state.storage, deleted.pdf_url.as_deref()) {
        discard_file(storage, key).await;
    }

    info!(business_id = %business_id, invoice_id = %id, "Invoice deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Line Item Handlers
// ============================================================================

/// POST /businesses/{business_id}/invoices/{id}/items
async fn add_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<LineItemInput>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let updated = InvoiceRepository::new((*state.db).clone())
        .add_item(business_id, id, payload)
        .await?;

    info!(business_id = %business_id, invoice_id = %id, total = %updated.invoice.total, "Invoice item added");
    Ok((StatusCode::CREATED, Json(InvoiceResponse::from(updated))))
}

/// PATCH /businesses/{business_id}/invoices/{id}/items/{item_id}
async fn update_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id, item_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(payload): Json<UpdateItemRequest>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let updated = InvoiceRepository::new((*state.db).clone())
        .update_item(
            business_id,
            id,
            item_id,
            UpdateItemInput {
                description: payload.description,
                quantity: payload.quantity,
                unit_price: payload.unit_price,
            },
        )
        .await?;

    info!(business_id = %business_id, invoice_id = %id, item_id = %item_id, "Invoice item updated");
    Ok(Json(InvoiceResponse::from(updated)))
}

/// DELETE /businesses/{business_id}/invoices/{id}/items/{item_id}
async fn delete_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id, item_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let updated = InvoiceRepository::new((*state.db).clone())
        .delete_item(business_id, id, item_id)
        .await?;

    info!(business_id = %business_id, invoice_id = %id, item_id = %item_id, "Invoice item removed");
    Ok(Json(InvoiceResponse::from(updated)))
}

// ============================================================================
// Lifecycle Handlers
// ============================================================================

/// POST /businesses/{business_id}/invoices/{id}/send
async fn send_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    let business = business_for(&state, &auth, business_id).await?;
    let repo = InvoiceRepository::new((*state.db).clone());
    repo.transition(business_id, id, |invoice| {
        InvoiceLifecycle::send(invoice.status.into())
    })
    .await?;

    let details = repo.get(business_id, id).await?;
    info!(business_id = %business_id, invoice_id = %id, number = %details.invoice.invoice_number, "Invoice sent");

    if let Some(client) = &details.client {
        let total = format_amount(details.invoice.total);
        let due_date = details.invoice.due_date.format("%Y-%m-%d").to_string();
        let notice = InvoiceNotice {
            number: &details.invoice.invoice_number,
            business_name: &business.name,
            total: &total,
            currency: &business.currency,
            due_date: &due_date,
        };
        if let Err(e) = state
            .email_service
            .send_invoice_email(&client.email, &client.name, &notice)
            .await
        {
            warn!(invoice_id = %id, error = %e, "Failed to email invoice to client");
        }
    }

    Ok(Json(InvoiceResponse::from(details)))
}

/// POST /businesses/{business_id}/invoices/{id}/mark-paid
async fn mark_paid(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
    payload: Option<Json<MarkPaidRequest>>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let today = Utc::now().date_naive();

    let invoice = InvoiceRepository::new((*state.db).clone())
        .transition(business_id, id, move |invoice| {
            InvoiceLifecycle::mark_paid(
                invoice.status.into(),
                payload.payment_date,
                payload.payment_method,
                today,
            )
        })
        .await?;

    info!(business_id = %business_id, invoice_id = %id, paid_at = ?invoice.paid_at, "Invoice marked paid");
    Ok(Json(invoice))
}

/// POST /businesses/{business_id}/invoices/{id}/mark-overdue
async fn mark_overdue(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let invoice = InvoiceRepository::new((*state.db).clone())
        .transition(business_id, id, |invoice| {
            InvoiceLifecycle::mark_overdue(invoice.status.into())
        })
        .await?;

    info!(business_id = %business_id, invoice_id = %id, "Invoice marked overdue");
    Ok(Json(invoice))
}

/// POST /businesses/{business_id}/invoices/{id}/cancel
async fn cancel_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
    payload: Option<Json<CancelRequest>>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    let invoice = InvoiceRepository::new((*state.db).clone())
        .transition(business_id, id, move |invoice| {
            InvoiceLifecycle::cancel(
                invoice.status.into(),
                invoice.notes.as_deref(),
                payload.reason.as_deref(),
            )
        })
        .await?;

    info!(business_id = %business_id, invoice_id = %id, "Invoice cancelled");
    Ok(Json(invoice))
}

// ============================================================================
// PDF Handlers
// ============================================================================

/// GET /businesses/{business_id}/invoices/{id}/pdf
///
/// Streams the stored PDF, rendering it first when it is missing.
async fn download_pdf(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Response> {
    let Some(storage) = state.storage.clone() else {
        return Ok(storage_not_configured());
    };
    let business = business_for(&state, &auth, business_id).await?;
    let repo = InvoiceRepository::new((*state.db).clone());
    let details = repo.get(business_id, id).await?;

    let key = match details.invoice.pdf_url.clone() {
        Some(key) if storage.exists(&key).await => key,
        _ => store_pdf(&storage, &repo, &business, &details).await?,
    };
    let bytes = storage.read(&key).await?;

    Ok(pdf_response(&details.invoice.invoice_number, bytes))
}

/// POST /businesses/{business_id}/invoices/{id}/regenerate-pdf
async fn regenerate_pdf(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Response> {
    let Some(storage) = state.storage.clone() else {
        return Ok(storage_not_configured());
    };
    let business = business_for(&state, &auth, business_id).await?;
    let repo = InvoiceRepository::new((*state.db).clone());
    let details = repo.get(business_id, id).await?;

    if let Some(previous) = details.invoice.pdf_url.as_deref() {
        discard_file(&storage, previous).await;
    }
    let pdf_url = store_pdf(&storage, &repo, &business, &details).await?;

    info!(business_id = %business_id, invoice_id = %id, pdf_url = %pdf_url, "Invoice PDF regenerated");
    Ok(Json(PdfResponse {
        invoice_id: id,
        pdf_url,
    })
    .into_response())
}

// ============================================================================
// Helpers
// ============================================================================

/// Renders the invoice, writes it to storage and records the key.
async fn store_pdf(
    storage: &StorageService,
    repo: &InvoiceRepository,
    business: &businesses::Model,
    details: &InvoiceWithItems,
) -> ApiResult<String> {
    let bytes = render_invoice(&invoice_document(business, details))?;
    let key = invoice_pdf_key(
        details.invoice.business_id,
        details.invoice.id,
        &details.invoice.invoice_number,
    );
    storage.write(&key, bytes).await?;
    repo.set_pdf_url(details.invoice.business_id, details.invoice.id, Some(key.clone()))
        .await?;
    Ok(key)
}

fn pdf_response(invoice_number: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{invoice_number}.pdf\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Builds the printable snapshot of an invoice.
fn invoice_document(business: &businesses::Model, details: &InvoiceWithItems) -> InvoiceDocument {
    let invoice = &details.invoice;
    let client = details.client.as_ref().map_or_else(Party::default, |client| Party {
        name: client.name.clone(),
        tax_id: None,
        email: Some(client.email.clone()),
        address: address_lines(client.address.as_ref()),
    });

    InvoiceDocument {
        number: invoice.invoice_number.clone(),
        status: InvoiceStatus::from(invoice.status).to_string(),
        date: invoice.date,
        due_date: invoice.due_date,
        business: Party {
            name: business.name.clone(),
            tax_id: business.tax_id.clone(),
            email: None,
            address: address_lines(business.address.as_ref()),
        },
        client,
        items: details
            .items
            .iter()
            .map(|item| DocumentLine {
                description: item.description.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                amount: item.amount,
            })
            .collect(),
        subtotal: invoice.subtotal,
        tax_rate: invoice.tax_rate,
        tax: invoice.tax,
        total: invoice.total,
        currency: business.currency.clone(),
        notes: invoice.notes.clone(),
    }
}

/// Printable lines of a stored address object.
fn address_lines(address: Option<&serde_json::Value>) -> Vec<String> {
    let Some(value) = address else {
        return Vec::new();
    };
    match serde_json::from_value::<Address>(value.clone()) {
        Ok(address) => [
            address.street,
            format!("{} {}", address.postal_code, address.city),
            address.country,
        ]
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_address_lines_from_stored_object() {
        let value = json!({
            "street": "12 Rue de Marseille",
            "city": "Tunis",
            "postalCode": "1000",
            "country": "Tunisia"
        });
        assert_eq!(
            address_lines(Some(&value)),
            vec!["12 Rue de Marseille", "1000 Tunis", "Tunisia"]
        );
    }

    #[test]
    fn test_address_lines_tolerates_other_shapes() {
        assert!(address_lines(None).is_empty());
        assert!(address_lines(Some(&json!("somewhere"))).is_empty());
    }

    #[test]
    fn test_pdf_response_headers() {
        let response = pdf_response("INV-2026-001", vec![b'%', b'P', b'D', b'F']);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "inline; filename=\"INV-2026-001.pdf\""
        );
    }
}
