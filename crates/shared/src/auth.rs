//! Authentication types for JWT and tokens.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// User email at issue time.
    pub email: String,
    /// Platform role, e.g. `BUSINESS_OWNER`.
    pub role: String,
    /// Tenant the user belongs to, if any.
    #[serde(default)]
    pub tenant: Option<Uuid>,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(
        user_id: Uuid,
        email: &str,
        role: &str,
        tenant_id: Option<Uuid>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            email: email.to_string(),
            role: role.to_string(),
            tenant: tenant_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the tenant ID from claims.
    #[must_use]
    pub const fn tenant_id(&self) -> Option<Uuid> {
        self.tenant
    }
}

/// Token pair returned after successful authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token (short-lived).
    pub access_token: String,
    /// Refresh token (long-lived, opaque).
    pub refresh_token: String,
    /// Access token expiration in seconds.
    pub expires_in: i64,
}

impl TokenPair {
    /// Creates a new token pair.
    #[must_use]
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_in,
        }
    }
}

/// Login request payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    /// User email.
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,
    /// User password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Tenant section of a registration.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTenant {
    /// Tenant name.
    #[validate(length(min = 2, message = "must be at least 2 characters"))]
    pub name: String,
    /// Optional domain.
    pub domain: Option<String>,
    /// Contact email, defaults to the registering user's email.
    #[validate(email(message = "Must be a valid email address"))]
    pub contact_email: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
}

/// Postal address.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Street line.
    pub street: String,
    /// City.
    pub city: String,
    /// Postal code.
    pub postal_code: String,
    /// Country.
    pub country: String,
}

/// Business section of a registration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterBusiness {
    /// Business name.
    #[validate(length(min = 2, max = 200, message = "must be between 2 and 200 characters"))]
    pub name: String,
    /// Logo URL.
    pub logo: Option<String>,
    /// Matricule Fiscal, validated by the domain layer.
    pub tax_id: Option<String>,
    /// ISO currency code, defaults to TND.
    pub currency: Option<String>,
    /// Business address.
    #[validate(nested)]
    pub address: Option<Address>,
}

/// Initial tax rate created with the business.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterTaxRate {
    /// Display name, e.g. "TVA 19%".
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    /// Percentage between 0 and 100.
    pub rate: Decimal,
    /// Whether this is the business default.
    #[serde(default)]
    pub is_default: bool,
}

/// Registration request payload.
///
/// Creates a user, its tenant, a first business and a tax rate in one step.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    /// User email.
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,
    /// User full name.
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,
    /// User password.
    #[validate(length(min = 8, max = 100, message = "Password must be at least 8 characters"))]
    pub password: String,
    /// Optional phone number.
    pub phone_number: Option<String>,
    /// Tenant details.
    #[validate(nested)]
    pub tenant: RegisterTenant,
    /// Business details.
    #[validate(nested)]
    pub business: RegisterBusiness,
    /// Initial tax rate.
    #[serde(rename = "taxRate")]
    #[validate(nested)]
    pub tax_rate: RegisterTaxRate,
}

/// Refresh token request.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    /// The refresh token.
    pub refresh_token: String,
}

/// Logout request.
#[derive(Debug, Clone, Deserialize)]
pub struct LogoutRequest {
    /// The refresh token to invalidate.
    pub refresh_token: String,
}

/// Email verification request.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyEmailRequest {
    /// The verification token from the email link.
    pub token: String,
}

/// Resend verification email request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResendVerificationRequest {
    /// User email to resend verification to.
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,
}

/// Forgot password request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    /// Account email.
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,
}

/// Reset password request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    /// The reset token from the email link.
    pub token: String,
    /// The new password.
    #[serde(alias = "newPassword")]
    #[validate(length(min = 8, max = 100, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// Profile update request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    /// New display name.
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: Option<String>,
    /// New email; clears the verified flag.
    #[validate(email(message = "Must be a valid email address"))]
    pub email: Option<String>,
    /// New password.
    #[validate(length(min = 8, max = 100, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    /// New phone number.
    pub phone_number: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn register_payload() -> serde_json::Value {
        json!({
            "email": "owner@example.tn",
            "name": "Amira Ben Salah",
            "password": "s3cret-password",
            "tenant": { "name": "Atelier Amira" },
            "business": { "name": "Atelier Amira SARL", "currency": "TND" },
            "taxRate": { "name": "TVA", "rate": 19, "is_default": true }
        })
    }

    #[test]
    fn test_register_request_deserializes_and_validates() {
        let request: RegisterRequest =
            serde_json::from_value(register_payload()).expect("deserialize");
        assert!(request.validate().is_ok());
        assert_eq!(request.tax_rate.rate, Decimal::from(19));
        assert!(request.tax_rate.is_default);
    }

    #[test]
    fn test_register_request_rejects_short_password() {
        let mut payload = register_payload();
        payload["password"] = json!("short");
        let request: RegisterRequest = serde_json::from_value(payload).expect("deserialize");
        let errors = request.validate().expect_err("should fail");
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_register_request_validates_nested_tenant() {
        let mut payload = register_payload();
        payload["tenant"]["name"] = json!("A");
        let request: RegisterRequest = serde_json::from_value(payload).expect("deserialize");
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_reset_password_accepts_camel_case() {
        let request: ResetPasswordRequest =
            serde_json::from_value(json!({"token": "t", "newPassword": "password123"}))
                .expect("deserialize");
        assert_eq!(request.new_password, "password123");
    }

    #[test]
    fn test_claims_carry_tenant() {
        let tenant = Uuid::new_v4();
        let claims = Claims::new(
            Uuid::new_v4(),
            "a@b.tn",
            "ACCOUNTANT",
            Some(tenant),
            Utc::now(),
        );
        assert_eq!(claims.tenant_id(), Some(tenant));
        assert_eq!(claims.role, "ACCOUNTANT");
    }
}
