//! Recurring invoice schedules.
//!
//! Schedules are stored data only: nothing generates invoices from them yet.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::businesses::business_for;
use crate::{
    AppState,
    error::{ApiError, ApiResult, bad_request, db_error},
    middleware::AuthUser,
};
use factura_core::invoice::RecurringFrequency;
use factura_db::{
    RecurringInvoiceRepository,
    repositories::{CreateRecurringInput, UpdateRecurringInput},
};
use factura_shared::types::{PageRequest, PageResponse};

/// Creates the recurring schedule routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/businesses/{business_id}/invoices/{id}/recur",
            post(create_schedule),
        )
        .route(
            "/businesses/{business_id}/invoices/recurring",
            get(list_schedules),
        )
        .route(
            "/businesses/{business_id}/invoices/recurring/{id}",
            get(get_schedule)
                .patch(update_schedule)
                .delete(deactivate_schedule),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for scheduling an invoice.
#[derive(Debug, Deserialize)]
pub struct CreateScheduleRequest {
    /// MONTHLY, QUARTERLY or YEARLY.
    pub frequency: String,
    /// First date of the schedule.
    pub start_date: NaiveDate,
    /// Optional last date.
    pub end_date: Option<NaiveDate>,
}

/// Request body for editing a schedule.
#[derive(Debug, Deserialize)]
pub struct UpdateScheduleRequest {
    /// New frequency.
    pub frequency: Option<String>,
    /// New start date.
    pub start_date: Option<NaiveDate>,
    /// New end date.
    pub end_date: Option<NaiveDate>,
    /// Pause or resume.
    pub is_active: Option<bool>,
}

fn parse_frequency(value: &str) -> Result<RecurringFrequency, ApiError> {
    RecurringFrequency::parse(value).ok_or_else(|| {
        bad_request(format!(
            "Unknown frequency '{value}', expected MONTHLY, QUARTERLY or YEARLY"
        ))
    })
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST /businesses/{business_id}/invoices/{id}/recur
async fn create_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, invoice_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CreateScheduleRequest>,
) -> ApiResult<impl IntoResponse> {
    let frequency = parse_frequency(&payload.frequency)?;
    business_for(&state, &auth, business_id).await?;

    let schedule = RecurringInvoiceRepository::new((*state.db).clone())
        .create(
            business_id,
            invoice_id,
            CreateRecurringInput {
                frequency: frequency.into(),
                start_date: payload.start_date,
                end_date: payload.end_date,
            },
        )
        .await?;

    info!(
        business_id = %business_id,
        invoice_id = %invoice_id,
        schedule_id = %schedule.id,
        frequency = %frequency,
        next = ?schedule.next_generation_date,
        "Recurring schedule created"
    );
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// GET /businesses/{business_id}/invoices/recurring
async fn list_schedules(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    Query(page): Query<PageRequest>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let (items, total) = RecurringInvoiceRepository::new((*state.db).clone())
        .list(business_id, &page)
        .await
        .map_err(db_error)?;
    Ok(Json(PageResponse::new(items, &page, total)))
}

/// GET /businesses/{business_id}/invoices/recurring/{id}
async fn get_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let schedule = RecurringInvoiceRepository::new((*state.db).clone())
        .get(business_id, id)
        .await?;
    Ok(Json(schedule))
}

/// PATCH /businesses/{business_id}/invoices/recurring/{id}
async fn update_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateScheduleRequest>,
) -> ApiResult<impl IntoResponse> {
    let frequency = payload
        .frequency
        .as_deref()
        .map(parse_frequency)
        .transpose()?;
    business_for(&state, &auth, business_id).await?;

    let schedule = RecurringInvoiceRepository::new((*state.db).clone())
        .update(
            business_id,
            id,
            UpdateRecurringInput {
                frequency: frequency.map(Into::into),
                start_date: payload.start_date,
                end_date: payload.end_date,
                is_active: payload.is_active,
            },
        )
        .await?;

    info!(business_id = %business_id, schedule_id = %id, next = ?schedule.next_generation_date, "Recurring schedule updated");
    Ok(Json(schedule))
}

/// DELETE /businesses/{business_id}/invoices/recurring/{id}
///
/// Deactivates the schedule; the row stays for history.
async fn deactivate_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    business_for(&state, &auth, business_id).await?;
    let schedule = RecurringInvoiceRepository::new((*state.db).clone())
        .deactivate(business_id, id)
        .await?;

    info!(business_id = %business_id, schedule_id = %id, "Recurring schedule deactivated");
    Ok(Json(schedule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("MONTHLY", RecurringFrequency::Monthly)]
    #[case("quarterly", RecurringFrequency::Quarterly)]
    #[case("Yearly", RecurringFrequency::Yearly)]
    fn test_parse_frequency(#[case] input: &str, #[case] expected: RecurringFrequency) {
        assert_eq!(parse_frequency(input).unwrap(), expected);
    }

    #[test]
    fn test_unknown_frequency_is_bad_request() {
        let err = parse_frequency("WEEKLY").unwrap_err();
        assert_eq!(err.0.status_code(), 400);
        assert!(err.0.message().contains("WEEKLY"));
    }
}
