//! Tenant repository.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use factura_shared::types::PageRequest;

use crate::entities::{sea_orm_active_enums::TenantStatus, tenants};

/// Error types for tenant operations.
#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    /// Tenant does not exist.
    #[error("Tenant not found")]
    NotFound,

    /// The caller owns no tenant.
    #[error("You do not own any tenant")]
    NoOwnedTenant,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a tenant.
#[derive(Debug, Clone)]
pub struct CreateTenantInput {
    /// Tenant name.
    pub name: String,
    /// Custom domain.
    pub domain: Option<String>,
    /// Free-form settings object.
    pub settings: Option<serde_json::Value>,
    /// Billing plan label.
    pub billing_plan: Option<String>,
    /// Contact email.
    pub contact_email: Option<String>,
    /// Logo URL.
    pub logo_url: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Owning user.
    pub owner_id: Option<Uuid>,
}

/// Input for updating a tenant. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateTenantInput {
    /// Tenant name.
    pub name: Option<String>,
    /// Custom domain.
    pub domain: Option<String>,
    /// Settings object, replaced wholesale.
    pub settings: Option<serde_json::Value>,
    /// Billing plan label.
    pub billing_plan: Option<String>,
    /// Contact email.
    pub contact_email: Option<String>,
    /// Logo URL.
    pub logo_url: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Lifecycle status.
    pub status: Option<TenantStatus>,
}

/// Tenant repository.
#[derive(Debug, Clone)]
pub struct TenantRepository {
    db: DatabaseConnection,
}

impl TenantRepository {
    /// Creates a new tenant repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(&self, input: CreateTenantInput) -> Result<tenants::Model, DbErr> {
        Self::insert(&self.db, input).await
    }

    pub(crate) async fn insert<C>(conn: &C, input: CreateTenantInput) -> Result<tenants::Model, DbErr>
    where
        C: sea_orm::ConnectionTrait,
    {
        let now = chrono::Utc::now().into();
        tenants::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            domain: Set(input.domain),
            settings: Set(input.settings.unwrap_or_else(|| serde_json::json!({}))),
            status: Set(TenantStatus::Active),
            owner_id: Set(input.owner_id),
            billing_plan: Set(input.billing_plan),
            contact_email: Set(input.contact_email),
            logo_url: Set(input.logo_url),
            description: Set(input.description),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await
    }

    /// Lists tenants, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, page: &PageRequest) -> Result<(Vec<tenants::Model>, u64), DbErr> {
        let query = tenants::Entity::find();
        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_desc(tenants::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok((items, total))
    }

    /// Gets a tenant by ID.
    ///
    /// # Errors
    ///
    /// Returns `TenantError::NotFound` if the tenant does not exist.
    pub async fn get(&self, id: Uuid) -> Result<tenants::Model, TenantError> {
        tenants::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(TenantError::NotFound)
    }

    /// Gets the tenant owned by a user.
    ///
    /// # Errors
    ///
    /// Returns `TenantError::NoOwnedTenant` if the user owns none.
    pub async fn find_by_owner(&self, owner_id: Uuid) -> Result<tenants::Model, TenantError> {
        tenants::Entity::find()
            .filter(tenants::Column::OwnerId.eq(owner_id))
            .order_by_asc(tenants::Column::CreatedAt)
            .one(&self.db)
            .await?
            .ok_or(TenantError::NoOwnedTenant)
    }

    /// Updates a tenant.
    ///
    /// # Errors
    ///
    /// Returns `TenantError::NotFound` if the tenant does not exist.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateTenantInput,
    ) -> Result<tenants::Model, TenantError> {
        let tenant = self.get(id).await?;
        let mut active: tenants::ActiveModel = tenant.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(domain) = input.domain {
            active.domain = Set(Some(domain));
        }
        if let Some(settings) = input.settings {
            active.settings = Set(settings);
        }
        if let Some(plan) = input.billing_plan {
            active.billing_plan = Set(Some(plan));
        }
        if let Some(email) = input.contact_email {
            active.contact_email = Set(Some(email));
        }
        if let Some(logo) = input.logo_url {
            active.logo_url = Set(Some(logo));
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    /// Deletes a tenant together with its businesses.
    ///
    /// # Errors
    ///
    /// Returns `TenantError::NotFound` if nothing was deleted.
    pub async fn delete(&self, id: Uuid) -> Result<(), TenantError> {
        let result = tenants::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(TenantError::NotFound);
        }
        Ok(())
    }
}
