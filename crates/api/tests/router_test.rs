//! Router-level tests that stop before any database access.
//!
//! The state carries a disconnected database handle, so every request here
//! must be answered by the middleware stack or a storage guard.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::AUTHORIZATION},
};
use http_body_util::BodyExt;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use factura_api::{AppState, create_router};
use factura_shared::{EmailConfig, EmailService, JwtConfig, JwtService};

fn test_state() -> AppState {
    AppState {
        db: Arc::new(DatabaseConnection::Disconnected),
        jwt_service: Arc::new(JwtService::new(JwtConfig::default())),
        email_service: Arc::new(EmailService::new(EmailConfig::default())),
        storage: None,
    }
}

fn app() -> (Router, AppState) {
    let state = test_state();
    (create_router(state.clone()), state)
}

fn token(state: &AppState, role: &str) -> String {
    state
        .jwt_service
        .generate_access_token(
            Uuid::new_v4(),
            "someone@example.com",
            role,
            Some(Uuid::new_v4()),
        )
        .unwrap()
}

async fn send(app: Router, method: &str, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = app
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_reports_database_down() {
    let (app, _) = app();
    let (status, body) = send(app, "GET", "/api/v1/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "down");
    assert_eq!(body["storage"], "disabled");
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let (app, _) = app();
    let (status, body) = send(app, "GET", "/api/v1/auth/me", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_token");
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let (app, _) = app();
    let (status, body) = send(app, "GET", "/api/v1/businesses", Some("not-a-jwt")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_token_with_unknown_role_is_rejected() {
    let (app, state) = app();
    let bearer = token(&state, "SUPERUSER");
    let (status, body) = send(app, "GET", "/api/v1/businesses", Some(&bearer)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_team_member_cannot_list_users() {
    let (app, state) = app();
    let bearer = token(&state, "TEAM_MEMBER");
    let (status, body) = send(app, "GET", "/api/v1/users", Some(&bearer)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_accountant_cannot_delete_tenant() {
    let (app, state) = app();
    let bearer = token(&state, "ACCOUNTANT");
    let uri = format!("/api/v1/tenants/{}", Uuid::new_v4());
    let (status, _) = send(app, "DELETE", &uri, Some(&bearer)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_team_member_cannot_approve_expense() {
    let (app, state) = app();
    let bearer = token(&state, "TEAM_MEMBER");
    let uri = format!(
        "/api/v1/businesses/{}/expenses/{}/approve",
        Uuid::new_v4(),
        Uuid::new_v4()
    );
    let (status, _) = send(app, "POST", &uri, Some(&bearer)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invoice_pdf_without_storage_is_unavailable() {
    let (app, state) = app();
    let bearer = token(&state, "BUSINESS_OWNER");
    let uri = format!(
        "/api/v1/businesses/{}/invoices/{}/pdf",
        Uuid::new_v4(),
        Uuid::new_v4()
    );
    let (status, body) = send(app, "GET", &uri, Some(&bearer)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "storage_not_configured");
}
