//! Client directory repository.

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use factura_shared::types::PageRequest;

use crate::entities::clients;

/// Error types for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Client does not exist in this business.
    #[error("Client not found")]
    NotFound,

    /// Stored communication history is not a JSON array.
    #[error("Communication history is corrupt")]
    CorruptHistory,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// One entry of a client's communication log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Communication {
    /// When the exchange happened.
    pub date: NaiveDate,
    /// Channel, e.g. "email" or "call".
    #[serde(rename = "type")]
    pub kind: String,
    /// What was said.
    pub notes: String,
}

/// Input for creating a client.
#[derive(Debug, Clone)]
pub struct CreateClientInput {
    /// Client name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Phone number.
    pub phone: Option<String>,
    /// Address object.
    pub address: Option<serde_json::Value>,
    /// Payment terms in days.
    pub payment_terms: Option<i32>,
    /// Billing details object.
    pub billing_details: Option<serde_json::Value>,
}

/// Input for updating a client.
#[derive(Debug, Clone, Default)]
pub struct UpdateClientInput {
    /// Client name.
    pub name: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Address object.
    pub address: Option<serde_json::Value>,
    /// Payment terms in days.
    pub payment_terms: Option<i32>,
    /// Billing details object.
    pub billing_details: Option<serde_json::Value>,
}

/// Client repository.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    db: DatabaseConnection,
}

impl ClientRepository {
    /// Creates a new client repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a client with an empty communication log.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(
        &self,
        business_id: Uuid,
        input: CreateClientInput,
    ) -> Result<clients::Model, DbErr> {
        let now = chrono::Utc::now().into();
        clients::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(business_id),
            name: Set(input.name),
            email: Set(input.email),
            phone: Set(input.phone),
            address: Set(input.address),
            payment_terms: Set(input.payment_terms),
            billing_details: Set(input.billing_details),
            communication_history: Set(serde_json::json!([])),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
    }

    /// Lists clients of a business, newest first, optionally matching
    /// `search` against name or email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        business_id: Uuid,
        search: Option<&str>,
        page: &PageRequest,
    ) -> Result<(Vec<clients::Model>, u64), DbErr> {
        let mut query = clients::Entity::find().filter(clients::Column::BusinessId.eq(business_id));

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{term}%");
            query = query.filter(
                Condition::any()
                    .add(Expr::col(clients::Column::Name).ilike(pattern.clone()))
                    .add(Expr::col(clients::Column::Email).ilike(pattern)),
            );
        }

        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_desc(clients::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok((items, total))
    }

    /// Gets a client of a business.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if no such client exists in the business.
    pub async fn get(&self, business_id: Uuid, id: Uuid) -> Result<clients::Model, ClientError> {
        clients::Entity::find_by_id(id)
            .filter(clients::Column::BusinessId.eq(business_id))
            .one(&self.db)
            .await?
            .ok_or(ClientError::NotFound)
    }

    /// Updates a client.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if no such client exists in the business.
    pub async fn update(
        &self,
        business_id: Uuid,
        id: Uuid,
        input: UpdateClientInput,
    ) -> Result<clients::Model, ClientError> {
        let client = self.get(business_id, id).await?;
        let mut active: clients::ActiveModel = client.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(email) = input.email {
            active.email = Set(email);
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(address) = input.address {
            active.address = Set(Some(address));
        }
        if let Some(terms) = input.payment_terms {
            active.payment_terms = Set(Some(terms));
        }
        if let Some(details) = input.billing_details {
            active.billing_details = Set(Some(details));
        }
        active.updated_at = Set(chrono::Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    /// Deletes a client and its invoices.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if no such client exists in the business.
    pub async fn delete(&self, business_id: Uuid, id: Uuid) -> Result<(), ClientError> {
        let result = clients::Entity::delete_many()
            .filter(clients::Column::Id.eq(id))
            .filter(clients::Column::BusinessId.eq(business_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ClientError::NotFound);
        }
        Ok(())
    }

    /// Appends an entry to the client's communication log.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if no such client exists in the business.
    pub async fn add_communication(
        &self,
        business_id: Uuid,
        id: Uuid,
        entry: Communication,
    ) -> Result<clients::Model, ClientError> {
        let client = self.get(business_id, id).await?;

        let mut history = match client.communication_history.clone() {
            serde_json::Value::Array(entries) => entries,
            serde_json::Value::Null => Vec::new(),
            _ => return Err(ClientError::CorruptHistory),
        };
        history.push(serde_json::to_value(entry).map_err(|_| ClientError::CorruptHistory)?);

        let mut active: clients::ActiveModel = client.into();
        active.communication_history = Set(serde_json::Value::Array(history));
        active.updated_at = Set(chrono::Utc::now().into());

        Ok(active.update(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_communication_serializes_type_field() {
        let entry = Communication {
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            kind: "call".to_string(),
            notes: "Relance paiement".to_string(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "call");
        assert_eq!(value["date"], "2026-03-02");
    }
}
