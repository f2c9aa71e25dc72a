//! Single-use email verification and password reset tokens.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{refresh_tokens, sea_orm_active_enums::UserTokenType, user_tokens, users};

use super::{generate_token, hash_token};

/// Email verification tokens stay valid for a day.
pub const VERIFICATION_TTL_HOURS: i64 = 24;

/// Password reset tokens stay valid for an hour.
pub const RESET_TTL_HOURS: i64 = 1;

/// Error types for token redemption.
#[derive(Debug, thiserror::Error)]
pub enum UserTokenError {
    /// Token unknown, expired, already used or of the wrong type.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token's user no longer exists.
    #[error("User not found")]
    UserNotFound,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Repository for typed single-use tokens.
#[derive(Debug, Clone)]
pub struct UserTokenRepository {
    db: DatabaseConnection,
}

impl UserTokenRepository {
    /// Creates a new user token repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Issues a new token of `token_type`, invalidating earlier unused ones
    /// of the same type. Returns the raw token to be sent by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create_token(
        &self,
        user_id: Uuid,
        token_type: UserTokenType,
    ) -> Result<String, DbErr> {
        self.invalidate_user_tokens(user_id, token_type).await?;

        let raw_token = generate_token();
        let now = Utc::now();
        let ttl = match token_type {
            UserTokenType::EmailVerification => Duration::hours(VERIFICATION_TTL_HOURS),
            UserTokenType::PasswordReset => Duration::hours(RESET_TTL_HOURS),
        };

        user_tokens::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            token_hash: Set(hash_token(&raw_token)),
            token_type: Set(token_type),
            expires_at: Set((now + ttl).into()),
            used_at: Set(None),
            created_at: Set(now.into()),
        }
        .insert(&self.db)
        .await?;

        Ok(raw_token)
    }

    /// Redeems an email verification token and marks the user verified.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the token is unknown, expired or used.
    pub async fn verify_email(&self, raw_token: &str) -> Result<users::Model, UserTokenError> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let token = Self::redeem(&txn, raw_token, UserTokenType::EmailVerification).await?;

        let user = users::Entity::find_by_id(token.user_id)
            .one(&txn)
            .await?
            .ok_or(UserTokenError::UserNotFound)?;

        let mut active: users::ActiveModel = user.into();
        active.is_verified = Set(true);
        active.updated_at = Set(now.into());
        let user = active.update(&txn).await?;

        txn.commit().await?;
        Ok(user)
    }

    /// Redeems a password reset token, stores the new hash and revokes every
    /// refresh token of the user.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the token is unknown, expired or used.
    pub async fn reset_password(
        &self,
        raw_token: &str,
        password_hash: &str,
    ) -> Result<users::Model, UserTokenError> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let token = Self::redeem(&txn, raw_token, UserTokenType::PasswordReset).await?;

        let user = users::Entity::find_by_id(token.user_id)
            .one(&txn)
            .await?
            .ok_or(UserTokenError::UserNotFound)?;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(password_hash.to_string());
        active.updated_at = Set(now.into());
        let user = active.update(&txn).await?;

        refresh_tokens::Entity::update_many()
            .col_expr(
                refresh_tokens::Column::RevokedAt,
                sea_orm::sea_query::Expr::value(now),
            )
            .filter(refresh_tokens::Column::UserId.eq(user.id))
            .filter(refresh_tokens::Column::RevokedAt.is_null())
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(user)
    }

    /// Marks every unused token of `token_type` for a user as used.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn invalidate_user_tokens(
        &self,
        user_id: Uuid,
        token_type: UserTokenType,
    ) -> Result<u64, DbErr> {
        let result = user_tokens::Entity::update_many()
            .col_expr(
                user_tokens::Column::UsedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(user_tokens::Column::UserId.eq(user_id))
            .filter(user_tokens::Column::TokenType.eq(token_type))
            .filter(user_tokens::Column::UsedAt.is_null())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    /// Finds a live token of the given type and marks it used.
    async fn redeem<C>(
        conn: &C,
        raw_token: &str,
        token_type: UserTokenType,
    ) -> Result<user_tokens::Model, UserTokenError>
    where
        C: sea_orm::ConnectionTrait,
    {
        let now = Utc::now();
        let token = user_tokens::Entity::find()
            .filter(user_tokens::Column::TokenHash.eq(hash_token(raw_token)))
            .filter(user_tokens::Column::TokenType.eq(token_type))
            .filter(user_tokens::Column::UsedAt.is_null())
            .filter(user_tokens::Column::ExpiresAt.gt(now))
            .one(conn)
            .await?
            .ok_or(UserTokenError::InvalidToken)?;

        let mut active: user_tokens::ActiveModel = token.clone().into();
        active.used_at = Set(Some(now.into()));
        active.update(conn).await?;

        Ok(token)
    }
}
