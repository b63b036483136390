use sea_orm_migration::prelude::*;

mod m20250601_000001_create_users;
mod m20250601_000002_create_refresh_tokens;
mod m20250601_000003_add_refresh_token_rotation;
mod m20250601_000004_create_outbox_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_users::Migration),
            Box::new(m20250601_000002_create_refresh_tokens::Migration),
            Box::new(m20250601_000003_add_refresh_token_rotation::Migration),
            Box::new(m20250601_000004_create_outbox_events::Migration),
        ]
    }
}
