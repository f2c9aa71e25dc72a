//! Authentication middleware for protected routes.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use factura_core::auth::Role;
use factura_shared::Claims;

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

fn unauthorized(error: &str, message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": error, "message": message })),
    )
        .into_response()
}

/// Authentication middleware that validates JWT tokens.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates the token and its role claim
/// 3. Stores the principal in request extensions for handlers and the
///    authorization middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return unauthorized(
            "missing_token",
            "Authorization header with Bearer token is required",
        );
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            let Some(user) = AuthUser::from_claims(claims) else {
                return unauthorized("invalid_token", "Invalid or malformed token");
            };
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(factura_shared::JwtError::Expired) => {
            unauthorized("token_expired", "Token has expired")
        }
        Err(_) => unauthorized("invalid_token", "Invalid or malformed token"),
    }
}

/// The authenticated principal.
///
/// Use this in handlers to get the caller:
///
/// ```ignore
/// async fn handler(auth: AuthUser) -> impl IntoResponse {
///     let user_id = auth.user_id();
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    claims: Claims,
    role: Role,
}

impl AuthUser {
    /// Builds the principal from validated claims; `None` for an unknown role.
    #[must_use]
    pub fn from_claims(claims: Claims) -> Option<Self> {
        let role = Role::parse(&claims.role)?;
        Some(Self { claims, role })
    }

    /// Returns the user ID from the claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.claims.user_id()
    }

    /// Returns the tenant the user belongs to, if any.
    #[must_use]
    pub const fn tenant_id(&self) -> Option<Uuid> {
        self.claims.tenant_id()
    }

    /// Returns the user's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns true for platform administrators.
    #[must_use]
    pub const fn is_platform_admin(&self) -> bool {
        self.role.is_platform_admin()
    }

    /// Returns the inner claims.
    #[must_use]
    pub const fn claims(&self) -> &Claims {
        &self.claims
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| unauthorized("unauthorized", "Authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn claims(role: &str) -> Claims {
        Claims::new(
            Uuid::new_v4(),
            "owner@example.tn",
            role,
            Some(Uuid::new_v4()),
            Utc::now() + Duration::minutes(15),
        )
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_principal_from_claims() {
        let user = AuthUser::from_claims(claims("ACCOUNTANT")).unwrap();
        assert_eq!(user.role(), Role::Accountant);
        assert!(!user.is_platform_admin());
        assert!(user.tenant_id().is_some());
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        assert!(AuthUser::from_claims(claims("SUPERUSER")).is_none());
    }
}
