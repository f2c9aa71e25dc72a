//! Password hashing with Argon2id.

use std::sync::OnceLock;

use argon2::{
    Argon2, PasswordHash,
    password_hash::{PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

/// Errors that can occur during password operations.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Failed to hash password.
    #[error("failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password.
    #[error("failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format.
    #[error("invalid password hash format")]
    InvalidHash,
}

impl From<PasswordError> for factura_shared::AppError {
    fn from(err: PasswordError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Hashes a password into a PHC string using Argon2id with a random salt.
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails.
///
/// ```
/// use factura_core::auth::hash_password;
///
/// let hash = hash_password("my_secure_password").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Checks a password against a stored hash.
///
/// Passing `None` as the hash (unknown account) still runs a full Argon2
/// verification against a throwaway hash and returns `Ok(false)`, so a missing
/// account costs the same as a wrong password.
///
/// # Errors
///
/// Returns `PasswordError::InvalidHash` if the stored hash is not a PHC string.
///
/// ```
/// use factura_core::auth::{hash_password, verify_password};
///
/// let hash = hash_password("my_password").unwrap();
/// assert!(verify_password("my_password", Some(&hash)).unwrap());
/// assert!(!verify_password("wrong_password", Some(&hash)).unwrap());
/// assert!(!verify_password("my_password", None).unwrap());
/// ```
pub fn verify_password(password: &str, hash: Option<&str>) -> Result<bool, PasswordError> {
    let Some(hash) = hash else {
        if let Some(dummy) = dummy_hash() {
            let _ = check(password, dummy);
        }
        return Ok(false);
    };
    check(password, hash)
}

fn check(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("factura-unknown-account").ok())
        .as_deref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_phc_argon2id() {
        let hash = hash_password("test_password_123!").unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_verify_correct_and_wrong_password() {
        let hash = hash_password("correct_password").unwrap();
        assert!(verify_password("correct_password", Some(&hash)).unwrap());
        assert!(!verify_password("wrong_password", Some(&hash)).unwrap());
    }

    #[test]
    fn test_salt_differs_between_hashes() {
        assert_ne!(
            hash_password("password1").unwrap(),
            hash_password("password1").unwrap()
        );
    }

    #[test]
    fn test_missing_account_is_plain_mismatch() {
        assert!(!verify_password("anything", None).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = verify_password("password", Some("invalid_hash"));
        assert!(matches!(result, Err(PasswordError::InvalidHash)));
    }
}
