//! Refresh token repository.
//!
//! Tokens are opaque random strings; only their SHA-256 digest is stored.
//! Rotation revokes the presented token and issues a replacement in one
//! transaction, so a token can be exchanged at most once.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{refresh_tokens, users};

use super::{generate_token, hash_token};

/// A freshly issued refresh token and its owner.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    /// Raw token to hand to the client.
    pub token: String,
    /// The user the token belongs to.
    pub user: users::Model,
}

/// Refresh token repository.
#[derive(Debug, Clone)]
pub struct RefreshTokenRepository {
    db: DatabaseConnection,
}

impl RefreshTokenRepository {
    /// Creates a new refresh token repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Issues a refresh token for a user and returns the raw value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(&self, user_id: Uuid, expires_at: DateTime<Utc>) -> Result<String, DbErr> {
        let raw_token = generate_token();
        Self::insert(&self.db, user_id, &raw_token, expires_at).await?;
        Ok(raw_token)
    }

    /// Exchanges a live refresh token for a new one.
    ///
    /// Returns `None` when the token is unknown, revoked or expired, or the
    /// user is suspended. A live token is revoked even when its user turns
    /// out to be suspended.
    ///
    /// # Errors
    ///
    /// Returns an error if a database operation fails.
    pub async fn rotate(
        &self,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<IssuedRefreshToken>, DbErr> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let Some(current) = refresh_tokens::Entity::find()
            .filter(refresh_tokens::Column::TokenHash.eq(hash_token(raw_token)))
            .filter(refresh_tokens::Column::RevokedAt.is_null())
            .filter(refresh_tokens::Column::ExpiresAt.gt(now))
            .lock_exclusive()
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(None);
        };

        let user_id = current.user_id;
        let mut active: refresh_tokens::ActiveModel = current.into();
        active.revoked_at = Set(Some(now.into()));
        active.update(&txn).await?;

        let user = users::Entity::find_by_id(user_id).one(&txn).await?;
        let Some(user) = user.filter(|u| !u.is_suspended) else {
            txn.commit().await?;
            return Ok(None);
        };

        let token = generate_token();
        Self::insert(&txn, user.id, &token, expires_at).await?;
        txn.commit().await?;

        Ok(Some(IssuedRefreshToken { token, user }))
    }

    /// Revokes a refresh token. Returns false if it was not live.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn revoke(&self, raw_token: &str) -> Result<bool, DbErr> {
        let result = refresh_tokens::Entity::update_many()
            .col_expr(
                refresh_tokens::Column::RevokedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(refresh_tokens::Column::TokenHash.eq(hash_token(raw_token)))
            .filter(refresh_tokens::Column::RevokedAt.is_null())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Revokes every live refresh token of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, DbErr> {
        let result = refresh_tokens::Entity::update_many()
            .col_expr(
                refresh_tokens::Column::RevokedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(refresh_tokens::Column::UserId.eq(user_id))
            .filter(refresh_tokens::Column::RevokedAt.is_null())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    pub(crate) async fn insert<C>(
        conn: &C,
        user_id: Uuid,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<refresh_tokens::Model, DbErr>
    where
        C: sea_orm::ConnectionTrait,
    {
        refresh_tokens::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            token_hash: Set(hash_token(raw_token)),
            expires_at: Set(expires_at.into()),
            revoked_at: Set(None),
            created_at: Set(Utc::now().into()),
        }
        .insert(conn)
        .await
    }
}
