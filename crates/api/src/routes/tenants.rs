//! Tenant management routes.

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

use crate::{
    AppState,
    error::{ApiResult, db_error, forbidden},
    middleware::AuthUser,
};
use factura_db::{
    TenantRepository,
    entities::{sea_orm_active_enums::TenantStatus, tenants},
    repositories::{CreateTenantInput, TenantError, UpdateTenantInput},
};
use factura_shared::types::{PageRequest, PageResponse};

/// Creates the tenant routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tenants", get(list_tenants).post(create_tenant))
        .route("/tenants/my", get(my_tenant))
        .route(
            "/tenants/{id}",
            get(get_tenant).patch(update_tenant).delete(delete_tenant),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for creating a tenant.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenantRequest {
    /// Tenant name.
    #[validate(length(min = 2, max = 100, message = "must be between 2 and 100 characters"))]
    pub name: String,
    /// Custom domain.
    pub domain: Option<String>,
    /// Free-form settings object.
    pub settings: Option<serde_json::Value>,
    /// Billing plan label.
    pub billing_plan: Option<String>,
    /// Contact email.
    #[validate(email(message = "Must be a valid email address"))]
    pub contact_email: Option<String>,
    /// Logo URL.
    pub logo_url: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Owning user.
    pub owner_id: Option<Uuid>,
}

/// Request body for updating a tenant.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTenantRequest {
    /// Tenant name.
    #[validate(length(min = 2, max = 100, message = "must be between 2 and 100 characters"))]
    pub name: Option<String>,
    /// Custom domain.
    pub domain: Option<String>,
    /// Settings object, replaced wholesale.
    pub settings: Option<serde_json::Value>,
    /// Billing plan label.
    pub billing_plan: Option<String>,
    /// Contact email.
    #[validate(email(message = "Must be a valid email address"))]
    pub contact_email: Option<String>,
    /// Logo URL.
    pub logo_url: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// active, inactive or suspended; platform admins only.
    pub status: Option<TenantStatus>,
}

// ============================================================================
// Access
// ============================================================================

/// Platform admins see every tenant; owners only their own.
fn ensure_owner(auth: &AuthUser, tenant: &tenants::Model, action: &str) -> ApiResult<()> {
    if auth.is_platform_admin() || tenant.owner_id == Some(auth.user_id()) {
        Ok(())
    } else {
        Err(forbidden(&format!("You can only {action} your own tenant")))
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST /tenants
async fn create_tenant(
    State(state): State<AppState>,
    Json(payload): Json<CreateTenantRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let tenant = TenantRepository::new((*state.db).clone())
        .create(CreateTenantInput {
            name: payload.name,
            domain: payload.domain,
            settings: payload.settings,
            billing_plan: payload.billing_plan,
            contact_email: payload.contact_email,
            logo_url: payload.logo_url,
            description: payload.description,
            owner_id: payload.owner_id,
        })
        .await
        .map_err(db_error)?;

    info!(tenant_id = %tenant.id, name = %tenant.name, "Tenant created");
    Ok((StatusCode::CREATED, Json(tenant)))
}

/// GET /tenants
async fn list_tenants(
    State(state): State<AppState>,
    Query(page): Query<PageRequest>,
) -> ApiResult<impl IntoResponse> {
    let (items, total) = TenantRepository::new((*state.db).clone())
        .list(&page)
        .await
        .map_err(db_error)?;
    Ok(Json(PageResponse::new(items, &page, total)))
}

/// GET /tenants/my
///
/// The tenant the caller owns, or failing that the tenant in their token.
async fn my_tenant(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let repo = TenantRepository::new((*state.db).clone());
    let tenant = match repo.find_by_owner(auth.user_id()).await {
        Ok(tenant) => tenant,
        Err(TenantError::NoOwnedTenant) => match auth.tenant_id() {
            Some(tenant_id) => repo.get(tenant_id).await?,
            None => return Err(TenantError::NoOwnedTenant.into()),
        },
        Err(e) => return Err(e.into()),
    };
    Ok(Json(tenant))
}

/// GET /tenants/{id}
async fn get_tenant(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let tenant = TenantRepository::new((*state.db).clone()).get(id).await?;
    ensure_owner(&auth, &tenant, "view")?;
    Ok(Json(tenant))
}

/// PATCH /tenants/{id}
async fn update_tenant(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTenantRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    let repo = TenantRepository::new((*state.db).clone());
    let tenant = repo.get(id).await?;
    ensure_owner(&auth, &tenant, "update")?;
    if payload.status.is_some() && !auth.is_platform_admin() {
        return Err(forbidden("Only platform administrators can change tenant status"));
    }

    let tenant = repo
        .update(
            id,
            UpdateTenantInput {
                name: payload.name,
                domain: payload.domain,
                settings: payload.settings,
                billing_plan: payload.billing_plan,
                contact_email: payload.contact_email,
                logo_url: payload.logo_url,
                description: payload.description,
                status: payload.status,
            },
        )
        .await?;

    info!(tenant_id = %id, by = %auth.user_id(), "Tenant updated");
    Ok(Json(tenant))
}

/// DELETE /tenants/{id}
async fn delete_tenant(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    TenantRepository::new((*state.db).clone()).delete(id).await?;

    info!(tenant_id = %id, by = %auth.user_id(), "Tenant deleted");
    Ok(StatusCode::NO_CONTENT)
}
