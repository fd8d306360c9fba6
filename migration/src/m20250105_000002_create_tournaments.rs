use sea_orm_migration::prelude::*;

use crate::enums::*;
use crate::macros::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Statuses are plain text so the same migration runs on SQLite.
        manager
            .create_table(
                Table::create()
                    .table(Tournament::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tournament::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tournament::ExternalId).string().unique_key())
                    .col(ColumnDef::new(Tournament::FeedName).string())
                    .col(ColumnDef::new(Tournament::Name).string().not_null())
                    .col(ColumnDef::new(Tournament::StartDate).date())
                    .col(ColumnDef::new(Tournament::EndDate).date())
                    .col(
                        ColumnDef::new(Tournament::Status)
                            .text()
                            .not_null()
                            .default("upcoming"),
                    )
                    .col(
                        ColumnDef::new(Tournament::PicksLocked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Tournament::LastSyncedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Tournament::EntryPrice).integer())
                    .col(ColumnDef::new(Tournament::ThreeEntryPrice).integer())
                    .col(
                        ColumnDef::new(Tournament::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tournament::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TournamentField::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TournamentField::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TournamentField::TournamentId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TournamentField::GolferId).integer().not_null())
                    .col(ColumnDef::new(TournamentField::Tier).integer().not_null())
                    .col(
                        ColumnDef::new(TournamentField::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(TournamentField::Table, TournamentField::TournamentId)
                            .to(Tournament::Table, Tournament::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(TournamentField::Table, TournamentField::GolferId)
                            .to(Golfer::Table, Golfer::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        unique_index!(
            manager,
            "unique_field_golfer",
            TournamentField,
            [TournamentField::TournamentId, TournamentField::GolferId]
        );

        manager
            .create_table(
                Table::create()
                    .table(TournamentResult::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TournamentResult::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TournamentResult::TournamentId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TournamentResult::GolferId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TournamentResult::Position).integer())
                    .col(ColumnDef::new(TournamentResult::ScoreToPar).integer())
                    .col(
                        ColumnDef::new(TournamentResult::Status)
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(TournamentResult::RoundNum).integer())
                    .col(ColumnDef::new(TournamentResult::Thru).integer())
                    .col(
                        ColumnDef::new(TournamentResult::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(TournamentResult::Table, TournamentResult::TournamentId)
                            .to(Tournament::Table, Tournament::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(TournamentResult::Table, TournamentResult::GolferId)
                            .to(Golfer::Table, Golfer::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        unique_index!(
            manager,
            "unique_result_golfer",
            TournamentResult,
            [TournamentResult::TournamentId, TournamentResult::GolferId]
        );
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        drop_table!(TournamentResult, manager);
        drop_table!(TournamentField, manager);
        drop_table!(Tournament, manager);
        Ok(())
    }
}
