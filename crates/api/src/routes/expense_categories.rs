//! Expense category routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::businesses::business_for;
use crate::{
    AppState,
    error::{ApiResult, db_error},
    middleware::AuthUser,
};
use factura_db::ExpenseCategoryRepository;
use factura_shared::types::{PageRequest, PageResponse};

/// Creates the expense category routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/businesses/{business_id}/expense-categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/businesses/{business_id}/expense-categories/{id}",
            get(get_category)
                .patch(update_category)
                .delete(delete_category),
        )
}

/// Request body for creating a category.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    /// Category name.
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}

/// Request body for updating a category.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    /// New name.
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
}

/// POST /businesses/{business_id}/expense-categories
async fn create_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    Json(payload): Json<CreateCategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    business_for(&state, &auth, business_id).await?;

    let category = ExpenseCategoryRepository::new((*state.db).clone())
        .create(business_id, payload.name.trim().to_string(), payload.description)
        .await
        .map_err(db_error)?;

    info!(business_id = %business_id, category_id = %category.id, name = %category.name, "Expense category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /businesses/{business_id}/expense-categories
async fn list_categories(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    Query(page): Query<PageRequest>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let (items, total) = ExpenseCategoryRepository::new((*state.db).clone())
        .list(business_id, &page)
        .await
        .map_err(db_error)?;
    Ok(Json(PageResponse::new(items, &page, total)))
}

/// GET /businesses/{business_id}/expense-categories/{id}
async fn get_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let category = ExpenseCategoryRepository::new((*state.db).clone())
        .get(business_id, id)
        .await?;
    Ok(Json(category))
}

/// PATCH /businesses/{business_id}/expense-categories/{id}
async fn update_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    business_for(&state, &auth, business_id).await?;

    let category = ExpenseCategoryRepository::new((*state.db).clone())
        .update(
            business_id,
            id,
            payload.name.map(|name| name.trim().to_string()),
            payload.description,
        )
        .await?;

    info!(business_id = %business_id, category_id = %id, "Expense category updated");
    Ok(Json(category))
}

/// DELETE /businesses/{business_id}/expense-categories/{id}
async fn delete_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    ExpenseCategoryRepository::new((*state.db).clone())
        .delete(business_id, id)
        .await?;

    info!(business_id = %business_id, category_id = %id, "Expense category deleted");
    Ok(StatusCode::NO_CONTENT)
}
