//! User repository for database operations.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use uuid::Uuid;

use factura_shared::types::PageRequest;

use crate::entities::{sea_orm_active_enums::UserRole, users};

use super::is_unique_violation;

/// Error types for user operations.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    /// User does not exist.
    #[error("User not found")]
    NotFound,

    /// Another account already uses the email.
    #[error("Email already in use")]
    EmailInUse,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Self-service profile changes.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New email; clears the verified flag when it changes.
    pub email: Option<String>,
    /// New Argon2 password hash.
    pub password_hash: Option<String>,
    /// New phone number.
    pub phone_number: Option<String>,
}

/// Administrative user changes.
#[derive(Debug, Clone, Default)]
pub struct AdminUserUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New email.
    pub email: Option<String>,
    /// New role.
    pub role: Option<UserRole>,
    /// Override the verified flag.
    pub is_verified: Option<bool>,
}

/// User repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(id).one(&self.db).await
    }

    /// Gets a user by ID or fails with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `UserError::NotFound` if the user does not exist.
    pub async fn get(&self, id: Uuid) -> Result<users::Model, UserError> {
        self.find_by_id(id).await?.ok_or(UserError::NotFound)
    }

    /// Lists users, newest first, optionally matching `search` against email
    /// or name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        search: Option<&str>,
        page: &PageRequest,
    ) -> Result<(Vec<users::Model>, u64), DbErr> {
        let mut query = users::Entity::find();

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{term}%");
            query = query.filter(
                Condition::any()
                    .add(Expr::col(users::Column::Email).ilike(pattern.clone()))
                    .add(Expr::col(users::Column::Name).ilike(pattern)),
            );
        }

        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_desc(users::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok((items, total))
    }

    /// Applies a self-service profile update.
    ///
    /// # Errors
    ///
    /// Returns `EmailInUse` if the new email belongs to another account.
    pub async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<users::Model, UserError> {
        let user = self.get(id).await?;
        let email_changed = update.email.as_ref().is_some_and(|e| *e != user.email);

        if let Some(email) = update.email.as_deref().filter(|_| email_changed) {
            self.ensure_email_free(email, id).await?;
        }

        let mut active: users::ActiveModel = user.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(email) = update.email.filter(|_| email_changed) {
            active.email = Set(email);
            active.is_verified = Set(false);
        }
        if let Some(hash) = update.password_hash {
            active.password_hash = Set(hash);
        }
        if let Some(phone) = update.phone_number {
            active.phone_number = Set(Some(phone));
        }
        active.updated_at = Set(chrono::Utc::now().into());

        active.update(&self.db).await.map_err(map_unique)
    }

    /// Applies an administrative update.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `EmailInUse`.
    pub async fn admin_update(
        &self,
        id: Uuid,
        update: AdminUserUpdate,
    ) -> Result<users::Model, UserError> {
        let user = self.get(id).await?;

        if let Some(email) = update.email.as_deref().filter(|e| *e != user.email) {
            self.ensure_email_free(email, id).await?;
        }

        let mut active: users::ActiveModel = user.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(email) = update.email {
            active.email = Set(email);
        }
        if let Some(role) = update.role {
            active.role = Set(role);
        }
        if let Some(verified) = update.is_verified {
            active.is_verified = Set(verified);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        active.update(&self.db).await.map_err(map_unique)
    }

    /// Changes a user's role.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    pub async fn change_role(&self, id: Uuid, role: UserRole) -> Result<users::Model, UserError> {
        self.admin_update(
            id,
            AdminUserUpdate {
                role: Some(role),
                ..Default::default()
            },
        )
        .await
    }

    /// Suspends or reactivates a user.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    pub async fn set_suspended(&self, id: Uuid, suspended: bool) -> Result<users::Model, UserError> {
        let user = self.get(id).await?;
        let mut active: users::ActiveModel = user.into();
        active.is_suspended = Set(suspended);
        active.updated_at = Set(chrono::Utc::now().into());
        Ok(active.update(&self.db).await?)
    }

    /// Deletes a user.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing was deleted.
    pub async fn delete(&self, id: Uuid) -> Result<(), UserError> {
        let result = users::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(UserError::NotFound);
        }
        Ok(())
    }

    /// Checks if an email is already registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn email_exists(&self, email: &str) -> Result<bool, DbErr> {
        let count = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }

    async fn ensure_email_free(&self, email: &str, owner: Uuid) -> Result<(), UserError> {
        let taken = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .filter(users::Column::Id.ne(owner))
            .count(&self.db)
            .await?;

        if taken > 0 {
            Err(UserError::EmailInUse)
        } else {
            Ok(())
        }
    }
}

fn map_unique(err: DbErr) -> UserError {
    if is_unique_violation(&err) {
        UserError::EmailInUse
    } else {
        UserError::Database(err)
    }
}
