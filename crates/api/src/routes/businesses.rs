//! Business registry routes: businesses, their settings and tax rates.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    error::{ApiResult, bad_request, db_error, forbidden},
    middleware::AuthUser,
};
use factura_core::business::{
    DEFAULT_CURRENCY, normalize_currency, validate_payment_terms, validate_rate, validate_tax_id,
};
use factura_db::{
    BusinessRepository, TaxRateRepository, TenantRepository,
    entities::businesses,
    repositories::{
        CreateBusinessInput, CreateTaxRateInput, UpdateBusinessInput, UpdateSettingsInput,
        UpdateTaxRateInput,
    },
};
use factura_shared::types::{PageRequest, PageResponse};

/// Creates the business routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/businesses", get(list_businesses).post(create_business))
        .route(
            "/businesses/{business_id}",
            get(get_business)
                .patch(update_business)
                .delete(delete_business),
        )
        .route(
            "/businesses/{business_id}/settings",
            get(get_settings).patch(update_settings),
        )
        .route(
            "/businesses/{business_id}/tax-rates",
            get(list_tax_rates).post(create_tax_rate),
        )
        .route(
            "/businesses/{business_id}/tax-rates/{tax_id}",
            get(get_tax_rate)
                .patch(update_tax_rate)
                .delete(delete_tax_rate),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for creating a business.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBusinessRequest {
    /// Target tenant; platform admins only, others use their own tenant.
    pub tenant_id: Option<Uuid>,
    /// Business name.
    #[validate(length(min = 2, max = 200, message = "must be between 2 and 200 characters"))]
    pub name: String,
    /// Logo URL.
    pub logo: Option<String>,
    /// Matricule Fiscal.
    pub tax_id: Option<String>,
    /// Currency code, defaults to TND.
    pub currency: Option<String>,
    /// Default tax rate.
    pub tax_rate: Option<Decimal>,
    /// Address object.
    pub address: Option<serde_json::Value>,
}

/// Request body for updating a business.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBusinessRequest {
    /// Business name.
    #[validate(length(min = 2, max = 200, message = "must be between 2 and 200 characters"))]
    pub name: Option<String>,
    /// Logo URL.
    pub logo: Option<String>,
    /// Matricule Fiscal.
    pub tax_id: Option<String>,
    /// Currency code.
    pub currency: Option<String>,
    /// Default tax rate.
    pub tax_rate: Option<Decimal>,
    /// Address object.
    pub address: Option<serde_json::Value>,
}

/// Request body for updating business settings.
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    /// Tax rate override.
    pub tax_rate: Option<Decimal>,
    /// Invoice number prefix.
    pub invoice_prefix: Option<String>,
    /// Payment terms in days.
    pub payment_terms: Option<i32>,
    /// Template configuration.
    pub invoice_template: Option<serde_json::Value>,
    /// Anything else.
    pub other_settings: Option<serde_json::Value>,
}

/// Request body for creating a tax rate.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaxRateRequest {
    /// Display name.
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    /// Percentage.
    pub rate: Decimal,
    /// Whether this becomes the default.
    #[serde(default)]
    pub is_default: bool,
}

/// Request body for updating a tax rate.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaxRateRequest {
    /// Display name.
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: Option<String>,
    /// Percentage.
    pub rate: Option<Decimal>,
    /// Default flag.
    pub is_default: Option<bool>,
}

// ============================================================================
// Access
// ============================================================================

/// Loads a business the caller may act on.
///
/// Callers must belong to the business's tenant; platform admins see every
/// business.
pub(crate) async fn business_for(
    state: &AppState,
    auth: &AuthUser,
    business_id: Uuid,
) -> ApiResult<businesses::Model> {
    let business = BusinessRepository::new((*state.db).clone())
        .get(business_id)
        .await?;

    if auth.is_platform_admin() || auth.tenant_id() == Some(business.tenant_id) {
        Ok(business)
    } else {
        Err(forbidden("You do not have access to this business"))
    }
}

// ============================================================================
// Business Handlers
// ============================================================================

/// POST /businesses
async fn create_business(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateBusinessRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let tenant_id = if auth.is_platform_admin() {
        payload.tenant_id.or(auth.tenant_id())
    } else {
        auth.tenant_id()
    }
    .ok_or_else(|| bad_request("A tenant is required to create a business"))?;
    TenantRepository::new((*state.db).clone())
        .get(tenant_id)
        .await?;

    if let Some(tax_id) = payload.tax_id.as_deref() {
        validate_tax_id(tax_id)?;
    }
    if let Some(rate) = payload.tax_rate {
        validate_rate(rate)?;
    }
    let currency = normalize_currency(payload.currency.as_deref().unwrap_or(DEFAULT_CURRENCY))?;

    let business = BusinessRepository::new((*state.db).clone())
        .create(CreateBusinessInput {
            tenant_id,
            name: payload.name,
            logo: payload.logo,
            tax_id: payload.tax_id.map(|t| t.trim().to_string()),
            currency,
            tax_rate: payload.tax_rate,
            address: payload.address,
        })
        .await
        .map_err(db_error)?;

    info!(business_id = %business.id, tenant_id = %tenant_id, "Business created");
    Ok((StatusCode::CREATED, Json(business)))
}

/// GET /businesses
async fn list_businesses(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(page): Query<PageRequest>,
) -> ApiResult<impl IntoResponse> {
    let scope = if auth.is_platform_admin() {
        None
    } else {
        match auth.tenant_id() {
            Some(tenant_id) => Some(tenant_id),
            None => {
                return Ok(Json(PageResponse::new(
                    Vec::<businesses::Model>::new(),
                    &page,
                    0,
                )));
            }
        }
    };

    let (items, total) = BusinessRepository::new((*state.db).clone())
        .list(scope, &page)
        .await
        .map_err(db_error)?;
    Ok(Json(PageResponse::new(items, &page, total)))
}

/// GET /businesses/{business_id}
async fn get_business(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(business_for(&state, &auth, business_id).await?))
}

/// PATCH /businesses/{business_id}
async fn update_business(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    Json(payload): Json<UpdateBusinessRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    business_for(&state, &auth, business_id).await?;

    if let Some(tax_id) = payload.tax_id.as_deref() {
        validate_tax_id(tax_id)?;
    }
    if let Some(rate) = payload.tax_rate {
        validate_rate(rate)?;
    }
    let currency = payload
        .currency
        .as_deref()
        .map(normalize_currency)
        .transpose()?;

    let business = BusinessRepository::new((*state.db).clone())
        .update(
            business_id,
            UpdateBusinessInput {
                name: payload.name,
                logo: payload.logo,
                tax_id: payload.tax_id.map(|t| t.trim().to_string()),
                currency,
                tax_rate: payload.tax_rate,
                address: payload.address,
            },
        )
        .await?;

    info!(business_id = %business_id, "Business updated");
    Ok(Json(business))
}

/// DELETE /businesses/{business_id}
async fn delete_business(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    BusinessRepository::new((*state.db).clone())
        .delete(business_id)
        .await?;

    info!(business_id = %business_id, "Business deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Settings Handlers
// ============================================================================

/// GET /businesses/{business_id}/settings
async fn get_settings(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let settings = BusinessRepository::new((*state.db).clone())
        .get_settings(business_id)
        .await?;
    Ok(Json(settings))
}

/// PATCH /businesses/{business_id}/settings
async fn update_settings(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;

    if let Some(rate) = payload.tax_rate {
        validate_rate(rate)?;
    }
    if let Some(days) = payload.payment_terms {
        validate_payment_terms(days)?;
    }
    if payload
        .invoice_prefix
        .as_deref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(bad_request("Invoice prefix must not be empty"));
    }

    let settings = BusinessRepository::new((*state.db).clone())
        .update_settings(
            business_id,
            UpdateSettingsInput {
                tax_rate: payload.tax_rate,
                invoice_prefix: payload.invoice_prefix,
                payment_terms: payload.payment_terms,
                invoice_template: payload.invoice_template,
                other_settings: payload.other_settings,
            },
        )
        .await?;

    info!(business_id = %business_id, "Business settings updated");
    Ok(Json(settings))
}

// ============================================================================
// Tax Rate Handlers
// ============================================================================

/// POST /businesses/{business_id}/tax-rates
async fn create_tax_rate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    Json(payload): Json<CreateTaxRateRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    validate_rate(payload.rate)?;
    business_for(&state, &auth, business_id).await?;

    let tax_rate = TaxRateRepository::new((*state.db).clone())
        .create(
            business_id,
            CreateTaxRateInput {
                name: payload.name,
                rate: payload.rate,
                is_default: payload.is_default,
            },
        )
        .await?;

    info!(business_id = %business_id, tax_rate_id = %tax_rate.id, "Tax rate created");
    Ok((StatusCode::CREATED, Json(tax_rate)))
}

/// GET /businesses/{business_id}/tax-rates
async fn list_tax_rates(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    Query(page): Query<PageRequest>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let (items, total) = TaxRateRepository::new((*state.db).clone())
        .list(business_id, &page)
        .await
        .map_err(db_error)?;
    Ok(Json(PageResponse::new(items, &page, total)))
}

/// GET /businesses/{business_id}/tax-rates/{tax_id}
async fn get_tax_rate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, tax_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let tax_rate = TaxRateRepository::new((*state.db).clone())
        .get(business_id, tax_id)
        .await?;
    Ok(Json(tax_rate))
}

/// PATCH /businesses/{business_id}/tax-rates/{tax_id}
async fn update_tax_rate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, tax_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateTaxRateRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    if let Some(rate) = payload.rate {
        validate_rate(rate)?;
    }
    business_for(&state, &auth, business_id).await?;

    let tax_rate = TaxRateRepository::new((*state.db).clone())
        .update(
            business_id,
            tax_id,
            UpdateTaxRateInput {
                name: payload.name,
                rate: payload.rate,
                is_default: payload.is_default,
            },
        )
        .await?;

    info!(business_id = %business_id, tax_rate_id = %tax_id, "Tax rate updated");
    Ok(Json(tax_rate))
}

/// DELETE /businesses/{business_id}/tax-rates/{tax_id}
async fn delete_tax_rate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, tax_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    TaxRateRepository::new((*state.db).clone())
        .delete(business_id, tax_id)
        .await?;

    info!(business_id = %business_id, tax_rate_id = %tax_id, "Tax rate deleted");
    Ok(StatusCode::NO_CONTENT)
}
