//! Database migrations for the user service.
//!
//! Schema and index definitions for the `identities` and `memberships` tables.
//! Every statement is idempotent so `Migrator::up` is safe to run at each boot.

pub use sea_orm_migration::prelude::*;

mod m2026_01_05_000001_create_identities;
mod m2026_01_05_000002_create_memberships;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_01_05_000001_create_identities::Migration),
            Box::new(m2026_01_05_000002_create_memberships::Migration),
        ]
    }
}
