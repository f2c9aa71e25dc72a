//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration and run raw SQL.

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_identity;
mod m20260301_000002_businesses;
mod m20260301_000003_invoicing;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_identity::Migration),
            Box::new(m20260301_000002_businesses::Migration),
            Box::new(m20260301_000003_invoicing::Migration),
        ]
    }
}
