//! Authentication routes: signup, login, token rotation, email verification,
//! password reset and the caller's own profile.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use validator::Validate;

use crate::{
    AppState,
    error::{ApiError, ApiResult, db_error},
    middleware::AuthUser,
};
use factura_core::auth::{Role, hash_password, verify_password};
use factura_core::business::{DEFAULT_CURRENCY, normalize_currency, validate_rate, validate_tax_id};
use factura_db::{
    RefreshTokenRepository, RegistrationRepository, UserRepository, UserTokenRepository,
    entities::{businesses, sea_orm_active_enums::UserTokenType, tax_rates, tenants, users},
    repositories::{
        CreateBusinessInput, CreateTaxRateInput, CreateTenantInput, ProfileUpdate,
        RegistrationInput,
    },
};
use factura_shared::{
    AppError, TokenPair,
    auth::{
        ForgotPasswordRequest, LoginRequest, LogoutRequest, RefreshRequest, RegisterRequest,
        ResendVerificationRequest, ResetPasswordRequest, UpdateProfileRequest,
        VerifyEmailRequest,
    },
};

/// Creates the public auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/resend-verification", post(resend_verification))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

/// Creates the auth routes that need a valid access token.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/profile", patch(update_profile))
}

// ============================================================================
// Response Types
// ============================================================================

/// Tokens plus the authenticated user.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// The user, without password hash.
    pub user: users::Model,
    /// Issued tokens.
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Everything created by a registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// The new owner.
    pub user: users::Model,
    /// The owner's tenant.
    pub tenant: tenants::Model,
    /// The first business.
    pub business: businesses::Model,
    /// The initial tax rate.
    #[serde(rename = "taxRate")]
    pub tax_rate: tax_rates::Model,
    /// Issued tokens.
    #[serde(flatten)]
    pub tokens: TokenPair,
}

// ============================================================================
// Helpers
// ============================================================================

/// Issues an access token and a fresh refresh token for `user`.
async fn issue_tokens(state: &AppState, user: &users::Model) -> ApiResult<TokenPair> {
    let access_token = access_token_for(state, user)?;
    let expires_at = Utc::now() + state.jwt_service.refresh_token_lifetime();
    let refresh_token = RefreshTokenRepository::new((*state.db).clone())
        .create(user.id, expires_at)
        .await
        .map_err(db_error)?;

    Ok(TokenPair::new(
        access_token,
        refresh_token,
        state.jwt_service.access_token_expires_in(),
    ))
}

fn access_token_for(state: &AppState, user: &users::Model) -> ApiResult<String> {
    let role = Role::from(user.role);
    Ok(state
        .jwt_service
        .generate_access_token(user.id, &user.email, role.as_str(), user.tenant_id)?)
}

/// Creates a verification token and mails it; failures are logged only.
async fn send_verification(state: &AppState, user: &users::Model) {
    let token = match UserTokenRepository::new((*state.db).clone())
        .create_token(user.id, UserTokenType::EmailVerification)
        .await
    {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, user_id = %user.id, "Failed to create verification token");
            return;
        }
    };

    if let Err(e) = state
        .email_service
        .send_verification_email(&user.email, &user.name, &token)
        .await
    {
        error!(error = %e, user_id = %user.id, "Failed to send verification email");
    }
}

fn invalid_credentials() -> ApiError {
    ApiError(AppError::Unauthorized("Invalid email or password".to_string()))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST /auth/register - Create a user with its tenant, business and tax rate.
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    if let Some(tax_id) = payload.business.tax_id.as_deref() {
        validate_tax_id(tax_id)?;
    }
    validate_rate(payload.tax_rate.rate)?;
    let currency = normalize_currency(
        payload
            .business
            .currency
            .as_deref()
            .unwrap_or(DEFAULT_CURRENCY),
    )?;

    let password_hash = hash_password(&payload.password)?;
    let address = payload
        .business
        .address
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| ApiError(AppError::Internal(e.to_string())))?;

    let input = RegistrationInput {
        email: payload.email.clone(),
        password_hash,
        name: payload.name,
        phone_number: payload.phone_number,
        tenant: CreateTenantInput {
            name: payload.tenant.name,
            domain: payload.tenant.domain,
            settings: None,
            billing_plan: None,
            contact_email: payload.tenant.contact_email.or(Some(payload.email)),
            logo_url: None,
            description: payload.tenant.description,
            owner_id: None,
        },
        business: CreateBusinessInput {
            tenant_id: uuid::Uuid::nil(),
            name: payload.business.name,
            logo: payload.business.logo,
            tax_id: payload.business.tax_id.map(|t| t.trim().to_string()),
            currency,
            tax_rate: Some(payload.tax_rate.rate),
            address,
        },
        tax_rate: CreateTaxRateInput {
            name: payload.tax_rate.name,
            rate: payload.tax_rate.rate,
            is_default: payload.tax_rate.is_default,
        },
    };

    let registered = RegistrationRepository::new((*state.db).clone())
        .register(input)
        .await?;

    send_verification(&state, &registered.user).await;
    let tokens = issue_tokens(&state, &registered.user).await?;

    info!(
        user_id = %registered.user.id,
        tenant_id = %registered.tenant.id,
        business_id = %registered.business.id,
        "User registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: registered.user,
            tenant: registered.tenant,
            business: registered.business,
            tax_rate: registered.tax_rate,
            tokens,
        }),
    ))
}

/// POST /auth/login - Authenticate user and return tokens.
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let user = UserRepository::new((*state.db).clone())
        .find_by_email(&payload.email)
        .await
        .map_err(db_error)?;

    // Unknown accounts still pay for a hash check.
    let valid = verify_password(
        &payload.password,
        user.as_ref().map(|u| u.password_hash.as_str()),
    )?;
    let Some(user) = user.filter(|_| valid) else {
        info!(email = %payload.email, "Failed login attempt");
        return Err(invalid_credentials());
    };

    if user.is_suspended {
        warn!(user_id = %user.id, "Login attempt on suspended account");
        return Err(ApiError(AppError::Forbidden(
            "This account has been suspended".to_string(),
        )));
    }

    let tokens = issue_tokens(&state, &user).await?;
    info!(user_id = %user.id, "User logged in successfully");

    Ok(Json(AuthResponse { user, tokens }))
}

/// POST /auth/refresh - Rotate a refresh token.
async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let expires_at = Utc::now() + state.jwt_service.refresh_token_lifetime();
    let issued = RefreshTokenRepository::new((*state.db).clone())
        .rotate(&payload.refresh_token, expires_at)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            ApiError(AppError::Unauthorized(
                "Invalid or expired refresh token".to_string(),
            ))
        })?;

    let access_token = access_token_for(&state, &issued.user)?;
    let tokens = TokenPair::new(
        access_token,
        issued.token,
        state.jwt_service.access_token_expires_in(),
    );

    Ok(Json(AuthResponse {
        user: issued.user,
        tokens,
    }))
}

/// POST /auth/logout - Revoke the presented refresh token.
async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<LogoutRequest>,
) -> ApiResult<impl IntoResponse> {
    let revoked = RefreshTokenRepository::new((*state.db).clone())
        .revoke(&payload.refresh_token)
        .await
        .map_err(db_error)?;

    if revoked {
        info!("Refresh token revoked");
    }
    Ok(Json(json!({ "message": "Logged out" })))
}

/// POST /auth/verify-email - Consume a verification token.
async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = UserTokenRepository::new((*state.db).clone())
        .verify_email(&payload.token)
        .await?;

    if let Err(e) = state
        .email_service
        .send_welcome_email(&user.email, &user.name)
        .await
    {
        error!(error = %e, user_id = %user.id, "Failed to send welcome email");
    }

    info!(user_id = %user.id, "Email verified");
    Ok(Json(json!({ "message": "Email verified successfully" })))
}

/// POST /auth/resend-verification - Issue a new verification token.
async fn resend_verification(
    State(state): State<AppState>,
    Json(payload): Json<ResendVerificationRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let user = UserRepository::new((*state.db).clone())
        .find_by_email(&payload.email)
        .await
        .map_err(db_error)?;

    if let Some(user) = user.filter(|u| !u.is_verified) {
        send_verification(&state, &user).await;
    }

    Ok(Json(json!({
        "message": "If the account exists and is not verified, a verification email has been sent"
    })))
}

/// POST /auth/forgot-password - Mail a reset link without revealing the account.
async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let user = UserRepository::new((*state.db).clone())
        .find_by_email(&payload.email)
        .await
        .map_err(db_error)?;

    if let Some(user) = user {
        match UserTokenRepository::new((*state.db).clone())
            .create_token(user.id, UserTokenType::PasswordReset)
            .await
        {
            Ok(token) => {
                if let Err(e) = state
                    .email_service
                    .send_password_reset_email(&user.email, &user.name, &token)
                    .await
                {
                    error!(error = %e, user_id = %user.id, "Failed to send reset email");
                }
            }
            Err(e) => error!(error = %e, user_id = %user.id, "Failed to create reset token"),
        }
    }

    Ok(Json(json!({
        "message": "If an account exists for this email, a reset link has been sent"
    })))
}

/// POST /auth/reset-password - Consume a reset token and set a new password.
async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    let password_hash = hash_password(&payload.new_password)?;

    let user = UserTokenRepository::new((*state.db).clone())
        .reset_password(&payload.token, &password_hash)
        .await?;

    info!(user_id = %user.id, "Password reset");
    Ok(Json(json!({ "message": "Password has been reset" })))
}

/// GET /auth/me - The authenticated user.
async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<impl IntoResponse> {
    let user = UserRepository::new((*state.db).clone())
        .get(auth.user_id())
        .await?;
    Ok(Json(user))
}

/// PATCH /auth/profile - Update the caller's own profile.
async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let password_hash = payload
        .password
        .as_deref()
        .map(hash_password)
        .transpose()?;

    let repo = UserRepository::new((*state.db).clone());
    let before = repo.get(auth.user_id()).await?;
    let user = repo
        .update_profile(
            auth.user_id(),
            ProfileUpdate {
                name: payload.name,
                email: payload.email,
                password_hash,
                phone_number: payload.phone_number,
            },
        )
        .await?;

    if user.email != before.email {
        send_verification(&state, &user).await;
    }

    info!(user_id = %user.id, "Profile updated");
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use factura_db::entities::sea_orm_active_enums::UserRole;

    fn user() -> users::Model {
        let now = Utc::now().into();
        users::Model {
            id: uuid::Uuid::new_v4(),
            email: "owner@example.tn".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            name: "Owner".to_string(),
            phone_number: None,
            role: UserRole::BusinessOwner,
            is_verified: false,
            is_suspended: false,
            tenant_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_auth_response_hides_password_hash() {
        let response = AuthResponse {
            user: user(),
            tokens: TokenPair::new("access".into(), "refresh".into(), 900),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value["user"].get("password_hash").is_none());
        assert_eq!(value["access_token"], "access");
        assert_eq!(value["refresh_token"], "refresh");
        assert_eq!(value["expires_in"], 900);
    }
}
