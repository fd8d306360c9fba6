use sea_orm::entity::prelude::*;

/// Lifecycle of a tournament. Only ever moves forward, except for an
/// administrator reverting `Active` back to `Upcoming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum TournamentStatus {
    #[sea_orm(string_value = "upcoming")]
    Upcoming,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Upcoming => "upcoming",
            TournamentStatus::Active => "active",
            TournamentStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ResultStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "cut")]
    Cut,
    #[sea_orm(string_value = "wd")]
    Withdrawn,
    #[sea_orm(string_value = "dq")]
    Disqualified,
    #[sea_orm(string_value = "finished")]
    Finished,
}

impl ResultStatus {
    /// Whether a golfer with this status still contributes a score.
    pub fn is_scoring(&self) -> bool {
        matches!(self, ResultStatus::Active | ResultStatus::Finished)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Active => "active",
            ResultStatus::Cut => "cut",
            ResultStatus::Withdrawn => "wd",
            ResultStatus::Disqualified => "dq",
            ResultStatus::Finished => "finished",
        }
    }
}
