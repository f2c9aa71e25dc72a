//! Expense routes: CRUD, the approval workflow and receipts.
//!
//! Role gates for approve and reject live in the route table. Ownership and
//! status rules are checked against the stored row through
//! `factura_core::expense`.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{businesses::business_for, discard_file};
use crate::{
    AppState,
    error::{ApiResult, bad_request, db_error, not_found, storage_not_configured},
    middleware::AuthUser,
};
use factura_core::{
    expense::{Actor, ExpenseStatus, ExpenseWorkflow, check_receipt, check_view, list_scope},
    storage::receipt_key,
};
use factura_db::{
    ExpenseRepository,
    repositories::{CreateExpenseInput, ExpenseFilter, UpdateExpenseInput},
};
use factura_shared::types::{PageRequest, PageResponse};

/// Multipart field carrying the receipt file.
const RECEIPT_FIELD: &str = "receipt";

/// Creates the expense routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/businesses/{business_id}/expenses",
            get(list_expenses).post(create_expense),
        )
        .route(
            "/businesses/{business_id}/expenses/{id}",
            get(get_expense).patch(update_expense).delete(delete_expense),
        )
        .route(
            "/businesses/{business_id}/expenses/{id}/submit",
            post(submit_expense),
        )
        .route(
            "/businesses/{business_id}/expenses/{id}/approve",
            post(approve_expense),
        )
        .route(
            "/businesses/{business_id}/expenses/{id}/reject",
            post(reject_expense),
        )
        .route(
            "/businesses/{business_id}/expenses/{id}/receipt",
            get(download_receipt)
                .post(upload_receipt)
                .delete(delete_receipt),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for recording an expense.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExpenseRequest {
    /// Optional category of the same business.
    pub category_id: Option<Uuid>,
    /// Amount spent.
    pub amount: Decimal,
    /// When it was spent.
    pub date: NaiveDate,
    /// What it was for.
    #[validate(length(min = 1, max = 500, message = "Description is required"))]
    pub description: String,
    /// Who was paid.
    pub vendor: Option<String>,
}

/// Request body for editing an expense.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExpenseRequest {
    /// New category.
    pub category_id: Option<Uuid>,
    /// New amount.
    pub amount: Option<Decimal>,
    /// New date.
    pub date: Option<NaiveDate>,
    /// New description.
    #[validate(length(min = 1, max = 500, message = "Description is required"))]
    pub description: Option<String>,
    /// New vendor.
    pub vendor: Option<String>,
}

/// Request body for approving an expense.
#[derive(Debug, Default, Deserialize)]
pub struct ApproveRequest {
    /// Optional approval notes.
    pub notes: Option<String>,
}

/// Request body for rejecting an expense.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    /// Why it was rejected.
    pub reason: String,
}

/// Expense list filters.
#[derive(Debug, Deserialize)]
pub struct ExpenseQuery {
    /// DRAFT, PENDING, APPROVED or REJECTED.
    pub status: Option<String>,
    /// Only this category.
    pub category_id: Option<Uuid>,
    /// Only this submitter, within what the caller may see.
    pub user_id: Option<Uuid>,
}

fn actor(auth: &AuthUser) -> Actor {
    Actor::new(auth.user_id(), auth.role())
}

// ============================================================================
// CRUD Handlers
// ============================================================================

/// POST /businesses/{business_id}/expenses
async fn create_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    Json(payload): Json<CreateExpenseRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    business_for(&state, &auth, business_id).await?;

    let expense = ExpenseRepository::new((*state.db).clone())
        .create(
            business_id,
            auth.user_id(),
            CreateExpenseInput {
                category_id: payload.category_id,
                amount: payload.amount,
                date: payload.date,
                description: payload.description,
                vendor: payload.vendor,
            },
        )
        .await?;

    info!(
        business_id = %business_id,
        expense_id = %expense.id,
        amount = %expense.amount,
        "Expense recorded"
    );
    Ok((StatusCode::CREATED, Json(expense)))
}

/// GET /businesses/{business_id}/expenses
///
/// Roles without full visibility only see their own expenses.
async fn list_expenses(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    Query(query): Query<ExpenseQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;

    let status = query
        .status
        .as_deref()
        .map(|s| {
            ExpenseStatus::parse(s).ok_or_else(|| bad_request(format!("Unknown expense status: {s}")))
        })
        .transpose()?;
    let filter = ExpenseFilter {
        scope: list_scope(&actor(&auth)),
        user_id: query.user_id,
        status: status.map(Into::into),
        category_id: query.category_id,
    };

    let (items, total) = ExpenseRepository::new((*state.db).clone())
        .list(business_id, &filter, &page)
        .await
        .map_err(db_error)?;
    Ok(Json(PageResponse::new(items, &page, total)))
}

/// GET /businesses/{business_id}/expenses/{id}
async fn get_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let expense = ExpenseRepository::new((*state.db).clone())
        .get(business_id, id)
        .await?;
    check_view(&actor(&auth), expense.user_id)?;
    Ok(Json(expense))
}

/// PATCH /businesses/{business_id}/expenses/{id}
async fn update_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateExpenseRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    business_for(&state, &auth, business_id).await?;

    let expense = ExpenseRepository::new((*state.db).clone())
        .update(
            business_id,
            id,
            &actor(&auth),
            UpdateExpenseInput {
                category_id: payload.category_id,
                amount: payload.amount,
                date: payload.date,
                description: payload.description,
                vendor: payload.vendor,
            },
        )
        .await?;

    info!(business_id = %business_id, expense_id = %id, "Expense updated");
    Ok(Json(expense))
}

/// DELETE /businesses/{business_id}/expenses/{id}
async fn delete_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let deleted = ExpenseRepository::new((*state.db).clone())
        .delete(business_id, id, &actor(&auth))
        .await?;

    if let (Some(storage), Some(key)) = (&state.storage, deleted.receipt_url.as_deref()) {
        discard_file(storage, key).await;
    }

    info!(business_id = %business_id, expense_id = %id, "Expense deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Workflow Handlers
// ============================================================================

/// POST /businesses/{business_id}/expenses/{id}/submit
async fn submit_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let caller = auth.user_id();

    let expense = ExpenseRepository::new((*state.db).clone())
        .apply_action(business_id, id, move |expense| {
            ExpenseWorkflow::submit(expense.status.into(), expense.user_id, caller)
        })
        .await?;

    info!(business_id = %business_id, expense_id = %id, "Expense submitted");
    Ok(Json(expense))
}

/// POST /businesses/{business_id}/expenses/{id}/approve
async fn approve_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
    payload: Option<Json<ApproveRequest>>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let approver = auth.user_id();

    let expense = ExpenseRepository::new((*state.db).clone())
        .apply_action(business_id, id, move |expense| {
            ExpenseWorkflow::approve(expense.status.into(), approver, payload.notes)
        })
        .await?;

    info!(business_id = %business_id, expense_id = %id, approved_by = %approver, "Expense approved");
    Ok(Json(expense))
}

/// POST /businesses/{business_id}/expenses/{id}/reject
async fn reject_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<RejectRequest>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let approver = auth.user_id();

    let expense = ExpenseRepository::new((*state.db).clone())
        .apply_action(business_id, id, move |expense| {
            ExpenseWorkflow::reject(expense.status.into(), approver, &payload.reason)
        })
        .await?;

    info!(business_id = %business_id, expense_id = %id, rejected_by = %approver, "Expense rejected");
    Ok(Json(expense))
}

// ============================================================================
// Receipt Handlers
// ============================================================================

/// POST /businesses/{business_id}/expenses/{id}/receipt
///
/// Accepts a multipart form with a `receipt` file field. A previous receipt
/// is deleted from storage once the new one is recorded.
async fn upload_receipt(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let Some(storage) = state.storage.clone() else {
        return Ok(storage_not_configured());
    };
    business_for(&state, &auth, business_id).await?;
    let repo = ExpenseRepository::new((*state.db).clone());
    let expense = repo.get(business_id, id).await?;
    check_receipt(&actor(&auth), expense.user_id)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(RECEIPT_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("receipt").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("Failed to read receipt: {e}")))?;
        upload = Some((filename, content_type, data));
        break;
    }
    let Some((filename, content_type, data)) = upload else {
        return Err(bad_request("Missing 'receipt' file field"));
    };

    let size = u64::try_from(data.len()).unwrap_or(u64::MAX);
    storage.validate_upload(&content_type, size)?;
    let key = receipt_key(business_id, id, &filename);
    let stored = storage.write(&key, data.to_vec()).await?;

    let (expense, previous) = repo.set_receipt(business_id, id, Some(key.clone())).await?;
    if let Some(previous) = previous.filter(|previous| *previous != key) {
        discard_file(&storage, &previous).await;
    }

    info!(
        business_id = %business_id,
        expense_id = %id,
        key = %stored.key,
        size = stored.size,
        "Receipt uploaded"
    );
    Ok(Json(expense).into_response())
}

/// GET /businesses/{business_id}/expenses/{id}/receipt
async fn download_receipt(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Response> {
    let Some(storage) = state.storage.clone() else {
        return Ok(storage_not_configured());
    };
    business_for(&state, &auth, business_id).await?;
    let expense = ExpenseRepository::new((*state.db).clone())
        .get(business_id, id)
        .await?;
    check_view(&actor(&auth), expense.user_id)?;

    let Some(key) = expense.receipt_url else {
        return Err(not_found("Expense has no receipt"));
    };
    let bytes = storage.read(&key).await?;
    let filename = key.rsplit('/').next().unwrap_or("receipt").to_string();

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&filename).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// DELETE /businesses/{business_id}/expenses/{id}/receipt
async fn delete_receipt(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let repo = ExpenseRepository::new((*state.db).clone());
    let expense = repo.get(business_id, id).await?;
    check_receipt(&actor(&auth), expense.user_id)?;

    let (expense, previous) = repo.set_receipt(business_id, id, None).await?;
    if let (Some(storage), Some(previous)) = (&state.storage, previous.as_deref()) {
        discard_file(storage, previous).await;
    }

    info!(business_id = %business_id, expense_id = %id, "Receipt removed");
    Ok(Json(expense))
}

/// Guesses a response content type from a stored receipt name.
fn content_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("receipt.pdf", "application/pdf")]
    #[case("scan.JPG", "image/jpeg")]
    #[case("photo.jpeg", "image/jpeg")]
    #[case("ticket.png", "image/png")]
    #[case("notes", "application/octet-stream")]
    #[case("archive.zip", "application/octet-stream")]
    fn test_content_type_for(#[case] filename: &str, #[case] expected: &str) {
        assert_eq!(content_type_for(filename), expected);
    }
}
