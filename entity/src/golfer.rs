use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "golfer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub external_id: Option<String>,
    pub name: String,
    pub country: Option<String>,
    pub skill_estimate: Option<f64>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tournament_field::Entity")]
    TournamentField,
    #[sea_orm(has_many = "super::tournament_result::Entity")]
    TournamentResult,
}

impl Related<super::tournament_field::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TournamentField.def()
    }
}

impl Related<super::tournament_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TournamentResult.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
