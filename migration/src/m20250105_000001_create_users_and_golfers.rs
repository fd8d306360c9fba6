use sea_orm_migration::prelude::*;

use crate::enums::*;
use crate::macros::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(User::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(User::Username).string().not_null().unique_key())
                    .col(ColumnDef::new(User::DisplayName).string())
                    .col(
                        ColumnDef::new(User::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Golfer::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Golfer::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Golfer::ExternalId).string().unique_key())
                    .col(ColumnDef::new(Golfer::Name).string().not_null())
                    .col(ColumnDef::new(Golfer::Country).string())
                    .col(ColumnDef::new(Golfer::SkillEstimate).double())
                    .col(
                        ColumnDef::new(Golfer::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        drop_table!(Golfer, manager);
        drop_table!(User, manager);
        Ok(())
    }
}
