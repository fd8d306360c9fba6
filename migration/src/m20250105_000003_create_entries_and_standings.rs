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
                    .table(Entry::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Entry::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Entry::UserId).integer().not_null())
                    .col(ColumnDef::new(Entry::TournamentId).integer().not_null())
                    .col(
                        ColumnDef::new(Entry::EntryNumber)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Entry::Tier1GolferId).integer())
                    .col(ColumnDef::new(Entry::Tier2GolferId).integer())
                    .col(ColumnDef::new(Entry::Tier3GolferId).integer())
                    .col(ColumnDef::new(Entry::Tier4GolferId).integer())
                    .col(
                        ColumnDef::new(Entry::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Entry::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Entry::Table, Entry::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Entry::Table, Entry::TournamentId)
                            .to(Tournament::Table, Tournament::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        unique_index!(
            manager,
            "unique_entry_identity",
            Entry,
            [Entry::UserId, Entry::TournamentId, Entry::EntryNumber]
        );

        manager
            .create_table(
                Table::create()
                    .table(Standing::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Standing::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Standing::TournamentId).integer().not_null())
                    .col(ColumnDef::new(Standing::UserId).integer().not_null())
                    .col(ColumnDef::new(Standing::EntryNumber).integer().not_null())
                    .col(ColumnDef::new(Standing::Tier1Score).integer())
                    .col(ColumnDef::new(Standing::Tier2Score).integer())
                    .col(ColumnDef::new(Standing::Tier3Score).integer())
                    .col(ColumnDef::new(Standing::Tier4Score).integer())
                    .col(ColumnDef::new(Standing::BestTwoTotal).integer())
                    .col(ColumnDef::new(Standing::ThirdBestScore).integer())
                    .col(
                        ColumnDef::new(Standing::HasThirdScore)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Standing::FourthBestScore).integer())
                    .col(
                        ColumnDef::new(Standing::HasFourthScore)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Standing::Rank).integer().not_null())
                    .col(
                        ColumnDef::new(Standing::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Standing::Table, Standing::TournamentId)
                            .to(Tournament::Table, Tournament::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Standing::Table, Standing::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        unique_index!(
            manager,
            "unique_standing_identity",
            Standing,
            [Standing::TournamentId, Standing::UserId, Standing::EntryNumber]
        );
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        drop_table!(Standing, manager);
        drop_table!(Entry, manager);
        Ok(())
    }
}
