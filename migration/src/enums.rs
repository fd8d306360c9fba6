use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
pub(crate) enum User {
    Table,
    Id,
    Username,
    DisplayName,
    IsAdmin,
}

#[derive(DeriveIden)]
pub(crate) enum Golfer {
    Table,
    Id,
    ExternalId,
    Name,
    Country,
    SkillEstimate,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Tournament {
    Table,
    Id,
    ExternalId,
    FeedName,
    Name,
    StartDate,
    EndDate,
    Status,
    PicksLocked,
    LastSyncedAt,
    EntryPrice,
    ThreeEntryPrice,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum TournamentField {
    Table,
    Id,
    TournamentId,
    GolferId,
    Tier,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum TournamentResult {
    Table,
    Id,
    TournamentId,
    GolferId,
    Position,
    ScoreToPar,
    Status,
    RoundNum,
    Thru,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Entry {
    Table,
    Id,
    UserId,
    TournamentId,
    EntryNumber,
    #[sea_orm(iden = "tier1_golfer_id")]
    Tier1GolferId,
    #[sea_orm(iden = "tier2_golfer_id")]
    Tier2GolferId,
    #[sea_orm(iden = "tier3_golfer_id")]
    Tier3GolferId,
    #[sea_orm(iden = "tier4_golfer_id")]
    Tier4GolferId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Standing {
    Table,
    Id,
    TournamentId,
    UserId,
    EntryNumber,
    #[sea_orm(iden = "tier1_score")]
    Tier1Score,
    #[sea_orm(iden = "tier2_score")]
    Tier2Score,
    #[sea_orm(iden = "tier3_score")]
    Tier3Score,
    #[sea_orm(iden = "tier4_score")]
    Tier4Score,
    BestTwoTotal,
    ThirdBestScore,
    HasThirdScore,
    FourthBestScore,
    HasFourthScore,
    Rank,
    UpdatedAt,
}
