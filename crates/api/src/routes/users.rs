//! Platform user administration.
//!
//! Every route here is restricted by the role table; handlers only apply
//! the change and log it.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    error::{ApiError, ApiResult, bad_request, db_error},
    middleware::AuthUser,
};
use factura_core::auth::Role;
use factura_db::{
    UserRepository, entities::sea_orm_active_enums::UserRole, repositories::AdminUserUpdate,
};
use factura_shared::types::{PageRequest, PageResponse};

/// Creates the user administration routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/users/{id}/role", patch(change_role))
        .route("/users/{id}/suspend", post(suspend_user))
        .route("/users/{id}/activate", post(activate_user))
}

// ============================================================================
// Request Types
// ============================================================================

/// Search filter for user lists.
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    /// Matches email or name.
    pub search: Option<String>,
}

/// Request body for an administrative user update.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    /// Display name.
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: Option<String>,
    /// Email address.
    #[validate(email(message = "Must be a valid email address"))]
    pub email: Option<String>,
    /// Role name.
    pub role: Option<String>,
    /// Verified flag.
    pub is_verified: Option<bool>,
}

/// Request body for a role change.
#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    /// One of the fixed role names.
    pub role: String,
}

fn parse_role(value: &str) -> Result<UserRole, ApiError> {
    Role::parse(value)
        .map(UserRole::from)
        .ok_or_else(|| bad_request(format!("Unknown role: {value}")))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /users
async fn list_users(
    State(state): State<AppState>,
    Query(filter): Query<UserQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<impl IntoResponse> {
    let (items, total) = UserRepository::new((*state.db).clone())
        .list(filter.search.as_deref(), &page)
        .await
        .map_err(db_error)?;
    Ok(Json(PageResponse::new(items, &page, total)))
}

/// GET /users/{id}
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = UserRepository::new((*state.db).clone()).get(id).await?;
    Ok(Json(user))
}

/// PATCH /users/{id}
async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    let role = payload.role.as_deref().map(parse_role).transpose()?;

    let user = UserRepository::new((*state.db).clone())
        .admin_update(
            id,
            AdminUserUpdate {
                name: payload.name,
                email: payload.email.map(|e| e.trim().to_lowercase()),
                role,
                is_verified: payload.is_verified,
            },
        )
        .await?;

    info!(user_id = %id, by = %auth.user_id(), "User updated");
    Ok(Json(user))
}

/// DELETE /users/{id}
async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if id == auth.user_id() {
        return Err(bad_request("You cannot delete your own account"));
    }
    UserRepository::new((*state.db).clone()).delete(id).await?;

    info!(user_id = %id, by = %auth.user_id(), "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /users/{id}/role
async fn change_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeRoleRequest>,
) -> ApiResult<impl IntoResponse> {
    let role = parse_role(&payload.role)?;
    let user = UserRepository::new((*state.db).clone())
        .change_role(id, role)
        .await?;

    info!(user_id = %id, role = ?user.role, by = %auth.user_id(), "User role changed");
    Ok(Json(user))
}

/// POST /users/{id}/suspend
async fn suspend_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if id == auth.user_id() {
        return Err(bad_request("You cannot suspend your own account"));
    }
    let user = UserRepository::new((*state.db).clone())
        .set_suspended(id, true)
        .await?;

    info!(user_id = %id, by = %auth.user_id(), "User suspended");
    Ok(Json(user))
}

/// POST /users/{id}/activate
async fn activate_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = UserRepository::new((*state.db).clone())
        .set_suspended(id, false)
        .await?;

    info!(user_id = %id, by = %auth.user_id(), "User activated");
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("PLATFORM_ADMIN", UserRole::PlatformAdmin)]
    #[case("business_owner", UserRole::BusinessOwner)]
    #[case("ACCOUNTANT", UserRole::Accountant)]
    #[case("TEAM_MEMBER", UserRole::TeamMember)]
    fn test_parse_role(#[case] input: &str, #[case] expected: UserRole) {
        assert_eq!(parse_role(input).unwrap(), expected);
    }

    #[test]
    fn test_unknown_role_is_bad_request() {
        let err = parse_role("SUPERUSER").unwrap_err();
        assert_eq!(err.0.status_code(), 400);
    }
}
