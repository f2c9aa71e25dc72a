//! API route definitions.

use axum::{Router, middleware};
use tracing::warn;

use factura_core::storage::StorageService;

use crate::{
    AppState,
    middleware::{auth_middleware, authorize_middleware},
};

pub mod auth;
pub mod businesses;
pub mod clients;
pub mod expense_categories;
pub mod expenses;
pub mod health;
pub mod invoices;
pub mod recurring;
pub mod tenants;
pub mod users;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Layers run outside-in: authenticate first, then check the role table.
    let protected_routes = Router::new()
        .merge(auth::protected_routes())
        .merge(users::routes())
        .merge(tenants::routes())
        .merge(businesses::routes())
        .merge(clients::routes())
        .merge(invoices::routes())
        .merge(recurring::routes())
        .merge(expenses::routes())
        .merge(expense_categories::routes())
        .layer(middleware::from_fn(authorize_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(protected_routes)
}

/// Deletes a stored file that is no longer referenced. Failures are logged.
pub(crate) async fn discard_file(storage: &StorageService, key: &str) {
    if let Err(e) = storage.delete(key).await {
        warn!(key = %key, error = %e, "Failed to delete stored file");
    }
}
