pub use sea_orm_migration::prelude::*;

mod m20241012_000001_create_price_snapshots;
mod m20241012_000002_create_price_history;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241012_000001_create_price_snapshots::Migration),
            Box::new(m20241012_000002_create_price_history::Migration),
        ]
    }
}
