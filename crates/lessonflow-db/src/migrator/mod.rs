//! Content store migrations

use sea_orm_migration::prelude::*;

mod m20260105_000001_init_schema;
mod m20260112_000001_create_assets;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260105_000001_init_schema::Migration),
            Box::new(m20260112_000001_create_assets::Migration),
        ]
    }
}
