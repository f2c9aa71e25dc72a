//! Role-based authorization.
//!
//! [`action_for`] is the route table: it maps a method and matched route to
//! the [`Action`] whose allowed roles are defined in `factura_core::auth`.
//! Routes missing from the table are open to any authenticated principal.

use axum::{
    Json,
    extract::{MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

use super::auth::AuthUser;
use factura_core::auth::{Action, permits};

/// Prefix the API router is nested under.
const API_PREFIX: &str = "/api/v1";

/// Returns the action a route performs, or `None` for open routes.
#[must_use]
pub fn action_for(method: &str, route: &str) -> Option<Action> {
    use Action as A;
    let route = route.strip_prefix(API_PREFIX).unwrap_or(route);
    let action = match (method, route) {
        // Users
        ("GET", "/users") => A::UserList,
        ("GET", "/users/{id}") => A::UserRead,
        ("PATCH", "/users/{id}") => A::UserUpdate,
        ("DELETE", "/users/{id}") => A::UserDelete,
        ("PATCH", "/users/{id}/role") => A::UserChangeRole,
        ("POST", "/users/{id}/suspend") => A::UserSuspend,
        ("POST", "/users/{id}/activate") => A::UserActivate,

        // Tenants
        ("POST", "/tenants") => A::TenantCreate,
        ("GET", "/tenants") => A::TenantList,
        ("GET", "/tenants/my") => A::TenantReadOwn,
        ("GET", "/tenants/{id}") => A::TenantRead,
        ("PATCH", "/tenants/{id}") => A::TenantUpdate,
        ("DELETE", "/tenants/{id}") => A::TenantDelete,

        // Businesses
        ("POST", "/businesses") => A::BusinessCreate,
        ("GET", "/businesses") => A::BusinessList,
        ("GET", "/businesses/{business_id}") => A::BusinessRead,
        ("PATCH", "/businesses/{business_id}") => A::BusinessUpdate,
        ("DELETE", "/businesses/{business_id}") => A::BusinessDelete,
        ("GET", "/businesses/{business_id}/settings") => A::SettingsRead,
        ("PATCH", "/businesses/{business_id}/settings") => A::SettingsUpdate,
        ("POST", "/businesses/{business_id}/tax-rates") => A::TaxRateCreate,
        (
            "GET",
            "/businesses/{business_id}/tax-rates" | "/businesses/{business_id}/tax-rates/{tax_id}",
        ) => A::TaxRateRead,
        ("PATCH", "/businesses/{business_id}/tax-rates/{tax_id}") => A::TaxRateUpdate,
        ("DELETE", "/businesses/{business_id}/tax-rates/{tax_id}") => A::TaxRateDelete,

        // Clients
        ("POST", "/businesses/{business_id}/clients") => A::ClientCreate,
        (
            "GET",
            "/businesses/{business_id}/clients"
            | "/businesses/{business_id}/clients/{id}"
            | "/businesses/{business_id}/clients/{id}/invoices",
        ) => A::ClientRead,
        (
            "PATCH" | "POST",
            "/businesses/{business_id}/clients/{id}"
            | "/businesses/{business_id}/clients/{id}/communications",
        ) => A::ClientUpdate,
        ("DELETE", "/businesses/{business_id}/clients/{id}") => A::ClientDelete,

        // Invoices
        ("POST", "/businesses/{business_id}/invoices") => A::InvoiceCreate,
        (
            "GET",
            "/businesses/{business_id}/invoices"
            | "/businesses/{business_id}/invoices/{id}"
            | "/businesses/{business_id}/invoices/{id}/pdf"
            | "/businesses/{business_id}/invoices/recurring"
            | "/businesses/{business_id}/invoices/recurring/{id}",
        ) => A::InvoiceRead,
        ("PATCH" | "DELETE", "/businesses/{business_id}/invoices/{id}")
        | ("POST", "/businesses/{business_id}/invoices/{id}/items")
        | ("PATCH" | "DELETE", "/businesses/{business_id}/invoices/{id}/items/{item_id}") => {
            A::InvoiceEdit
        }
        (
            "POST",
            "/businesses/{business_id}/invoices/{id}/send"
            | "/businesses/{business_id}/invoices/{id}/mark-paid"
            | "/businesses/{business_id}/invoices/{id}/mark-overdue"
            | "/businesses/{business_id}/invoices/{id}/cancel",
        ) => A::InvoiceTransition,
        ("POST", "/businesses/{business_id}/invoices/{id}/regenerate-pdf") => {
            A::InvoiceRegeneratePdf
        }
        ("POST", "/businesses/{business_id}/invoices/{id}/recur")
        | ("PATCH" | "DELETE", "/businesses/{business_id}/invoices/recurring/{id}") => {
            A::RecurringManage
        }

        // Expenses
        (
            "POST",
            "/businesses/{business_id}/expenses/{id}/approve"
            | "/businesses/{business_id}/expenses/{id}/reject",
        ) => A::ExpenseDecide,
        (
            "GET",
            "/businesses/{business_id}/expense-categories"
            | "/businesses/{business_id}/expense-categories/{id}",
        ) => A::CategoryRead,
        (
            "POST" | "PATCH" | "DELETE",
            "/businesses/{business_id}/expense-categories"
            | "/businesses/{business_id}/expense-categories/{id}",
        ) => A::CategoryManage,

        _ => return None,
    };
    Some(action)
}

/// Rejects callers whose role is not allowed for the matched route.
///
/// Runs after [`super::auth_middleware`], which stores the [`AuthUser`].
pub async fn authorize_middleware(request: Request, next: Next) -> Response {
    let action = request
        .extensions()
        .get::<MatchedPath>()
        .and_then(|path| action_for(request.method().as_str(), path.as_str()));

    if let Some(action) = action {
        let Some(user) = request.extensions().get::<AuthUser>() else {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "unauthorized",
                    "message": "Authentication required"
                })),
            )
                .into_response();
        };

        if !permits(user.role(), action) {
            warn!(
                user_id = %user.user_id(),
                role = %user.role(),
                action = ?action,
                "Role not allowed for route"
            );
            return (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "forbidden",
                    "message": "Your role does not allow this operation"
                })),
            )
                .into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("GET", "/users", Some(Action::UserList))]
    #[case("PATCH", "/users/{id}/role", Some(Action::UserChangeRole))]
    #[case("GET", "/tenants/my", Some(Action::TenantReadOwn))]
    #[case("GET", "/api/v1/businesses/{business_id}/settings", Some(Action::SettingsRead))]
    #[case("POST", "/businesses/{business_id}/clients/{id}/communications", Some(Action::ClientUpdate))]
    #[case("DELETE", "/businesses/{business_id}/invoices/{id}/items/{item_id}", Some(Action::InvoiceEdit))]
    #[case("POST", "/businesses/{business_id}/invoices/{id}/cancel", Some(Action::InvoiceTransition))]
    #[case("PATCH", "/businesses/{business_id}/invoices/recurring/{id}", Some(Action::RecurringManage))]
    #[case("POST", "/businesses/{business_id}/expenses/{id}/reject", Some(Action::ExpenseDecide))]
    #[case("POST", "/businesses/{business_id}/expense-categories", Some(Action::CategoryManage))]
    fn test_route_table(#[case] method: &str, #[case] route: &str, #[case] expected: Option<Action>) {
        assert_eq!(action_for(method, route), expected);
    }

    #[rstest]
    #[case("GET", "/auth/me")]
    #[case("PATCH", "/auth/profile")]
    #[case("POST", "/businesses/{business_id}/expenses")]
    #[case("POST", "/businesses/{business_id}/expenses/{id}/submit")]
    #[case("POST", "/businesses/{business_id}/expenses/{id}/receipt")]
    fn test_open_routes(#[case] method: &str, #[case] route: &str) {
        assert_eq!(action_for(method, route), None);
    }
}
