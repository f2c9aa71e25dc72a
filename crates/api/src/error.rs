//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use factura_shared::AppError;

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// An [`AppError`] rendered as `{"error": <code>, "message": <text>}`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl<E> From<E> for ApiError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Server-side details stay in the logs.
        let message = if err.is_server_error() {
            error!(error = %err, "Request failed");
            "An internal error occurred"
        } else {
            err.message()
        };

        (
            status,
            Json(json!({
                "error": err.error_code().to_ascii_lowercase(),
                "message": message
            })),
        )
            .into_response()
    }
}

/// Shorthand for a 403.
pub fn forbidden(message: &str) -> ApiError {
    ApiError(AppError::Forbidden(message.to_string()))
}

/// Shorthand for a 404.
pub fn not_found(message: &str) -> ApiError {
    ApiError(AppError::NotFound(message.to_string()))
}

/// Shorthand for a 400.
pub fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError(AppError::Validation(message.into()))
}

/// 503 returned by file endpoints when no storage backend is configured.
pub fn storage_not_configured() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "error": "storage_not_configured",
            "message": "File storage is not configured"
        })),
    )
        .into_response()
}

/// Maps a raw database error.
#[allow(clippy::needless_pass_by_value)]
pub fn db_error(err: sea_orm::DbErr) -> ApiError {
    ApiError(factura_db::repositories::errors::database_error(&err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_client_error_keeps_message() {
        let response = not_found("Invoice not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["message"], "Invoice not found");
    }

    #[tokio::test]
    async fn test_server_error_hides_details() {
        let response = ApiError(AppError::Database("connection reset".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "database_error");
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_rule_error_is_bad_request() {
        let err: ApiError = factura_core::invoice::InvoiceError::NoItems.into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
