pub use sea_orm_migration::prelude::*;
mod enums;
mod m20250105_000001_create_users_and_golfers;
mod m20250105_000002_create_tournaments;
mod m20250105_000003_create_entries_and_standings;
mod macros;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250105_000001_create_users_and_golfers::Migration),
            Box::new(m20250105_000002_create_tournaments::Migration),
            Box::new(m20250105_000003_create_entries_and_standings::Migration),
        ]
    }
}
