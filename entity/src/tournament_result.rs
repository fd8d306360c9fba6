use super::sea_orm_active_enums::ResultStatus;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tournament_result")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tournament_id: i32,
    pub golfer_id: i32,
    /// `None` when the golfer holds no numeric finish (cut, withdrawn, not started).
    pub position: Option<i32>,
    pub score_to_par: Option<i32>,
    pub status: ResultStatus,
    pub round_num: Option<i32>,
    pub thru: Option<i32>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tournament::Entity",
        from = "Column::TournamentId",
        to = "super::tournament::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Tournament,
    #[sea_orm(
        belongs_to = "super::golfer::Entity",
        from = "Column::GolferId",
        to = "super::golfer::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Golfer,
}

impl Related<super::tournament::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tournament.def()
    }
}

impl Related<super::golfer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Golfer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
