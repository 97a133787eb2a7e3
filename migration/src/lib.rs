pub use sea_orm_migration::prelude::*;

mod m20260829_000001_create_stored_tokens;
mod m20260829_000002_create_vault_entries;
mod m20260829_000003_create_security_events;
mod m20260829_000004_create_jobs;
mod m20260829_000005_create_candidates;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260829_000001_create_stored_tokens::Migration),
            Box::new(m20260829_000002_create_vault_entries::Migration),
            Box::new(m20260829_000003_create_security_events::Migration),
            Box::new(m20260829_000004_create_jobs::Migration),
            Box::new(m20260829_000005_create_candidates::Migration),
        ]
    }
}
