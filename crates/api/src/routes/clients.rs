//! Client directory routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::businesses::business_for;
use crate::{
    AppState,
    error::{ApiResult, bad_request, db_error},
    middleware::AuthUser,
};
use factura_core::business::validate_payment_terms;
use factura_db::{
    ClientRepository, InvoiceRepository,
    repositories::{Communication, CreateClientInput, InvoiceFilter, UpdateClientInput},
};
use factura_shared::types::{PageRequest, PageResponse};

/// Creates the client routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/businesses/{business_id}/clients",
            get(list_clients).post(create_client),
        )
        .route(
            "/businesses/{business_id}/clients/{id}",
            get(get_client).patch(update_client).delete(delete_client),
        )
        .route(
            "/businesses/{business_id}/clients/{id}/invoices",
            get(list_client_invoices),
        )
        .route(
            "/businesses/{business_id}/clients/{id}/communications",
            post(add_communication),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for creating a client.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    /// Client name.
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    /// Contact email.
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,
    /// Phone number.
    pub phone: Option<String>,
    /// Address object.
    pub address: Option<serde_json::Value>,
    /// Payment terms in days.
    pub payment_terms: Option<i32>,
    /// Billing details object.
    pub billing_details: Option<serde_json::Value>,
}

/// Request body for updating a client.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClientRequest {
    /// Client name.
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: Option<String>,
    /// Contact email.
    #[validate(email(message = "Must be a valid email address"))]
    pub email: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Address object.
    pub address: Option<serde_json::Value>,
    /// Payment terms in days.
    pub payment_terms: Option<i32>,
    /// Billing details object.
    pub billing_details: Option<serde_json::Value>,
}

/// Request body for logging a communication.
#[derive(Debug, Deserialize)]
pub struct CommunicationRequest {
    /// When it happened, defaults to today.
    pub date: Option<NaiveDate>,
    /// Channel, e.g. "email" or "call".
    #[serde(rename = "type")]
    pub kind: String,
    /// What was said.
    pub notes: String,
}

/// Search filter for client lists.
#[derive(Debug, Deserialize)]
pub struct ClientQuery {
    /// Matches name or email.
    pub search: Option<String>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST /businesses/{business_id}/clients
async fn create_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    Json(payload): Json<CreateClientRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    if let Some(days) = payload.payment_terms {
        validate_payment_terms(days)?;
    }
    business_for(&state, &auth, business_id).await?;

    let client = ClientRepository::new((*state.db).clone())
        .create(
            business_id,
            CreateClientInput {
                name: payload.name,
                email: payload.email,
                phone: payload.phone,
                address: payload.address,
                payment_terms: payload.payment_terms,
                billing_details: payload.billing_details,
            },
        )
        .await
        .map_err(db_error)?;

    info!(business_id = %business_id, client_id = %client.id, "Client created");
    Ok((StatusCode::CREATED, Json(client)))
}

/// GET /businesses/{business_id}/clients
async fn list_clients(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    Query(filter): Query<ClientQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let (items, total) = ClientRepository::new((*state.db).clone())
        .list(business_id, filter.search.as_deref(), &page)
        .await
        .map_err(db_error)?;
    Ok(Json(PageResponse::new(items, &page, total)))
}

/// GET /businesses/{business_id}/clients/{id}
async fn get_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let client = ClientRepository::new((*state.db).clone())
        .get(business_id, id)
        .await?;
    Ok(Json(client))
}

/// PATCH /businesses/{business_id}/clients/{id}
async fn update_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateClientRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    if let Some(days) = payload.payment_terms {
        validate_payment_terms(days)?;
    }
    business_for(&state, &auth, business_id).await?;

    let client = ClientRepository::new((*state.db).clone())
        .update(
            business_id,
            id,
            UpdateClientInput {
                name: payload.name,
                email: payload.email,
                phone: payload.phone,
                address: payload.address,
                payment_terms: payload.payment_terms,
                billing_details: payload.billing_details,
            },
        )
        .await?;

    info!(business_id = %business_id, client_id = %id, "Client updated");
    Ok(Json(client))
}

/// DELETE /businesses/{business_id}/clients/{id}
async fn delete_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    ClientRepository::new((*state.db).clone())
        .delete(business_id, id)
        .await?;

    info!(business_id = %business_id, client_id = %id, "Client deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /businesses/{business_id}/clients/{id}/invoices
async fn list_client_invoices(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
    Query(page): Query<PageRequest>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    ClientRepository::new((*state.db).clone())
        .get(business_id, id)
        .await?;

    let filter = InvoiceFilter {
        status: None,
        client_id: Some(id),
    };
    let (items, total) = InvoiceRepository::new((*state.db).clone())
        .list(business_id, &filter, &page)
        .await
        .map_err(db_error)?;
    Ok(Json(PageResponse::new(items, &page, total)))
}

/// POST /businesses/{business_id}/clients/{id}/communications
async fn add_communication(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CommunicationRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.kind.trim().is_empty() {
        return Err(bad_request("Communication type is required"));
    }
    business_for(&state, &auth, business_id).await?;

    let entry = Communication {
        date: payload.date.unwrap_or_else(|| Utc::now().date_naive()),
        kind: payload.kind.trim().to_string(),
        notes: payload.notes,
    };
    let client = ClientRepository::new((*state.db).clone())
        .add_communication(business_id, id, entry)
        .await?;

    info!(business_id = %business_id, client_id = %id, "Communication logged");
    Ok((StatusCode::CREATED, Json(client)))
}
