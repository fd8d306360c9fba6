use super::sea_orm_active_enums::TournamentStatus;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tournament")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub external_id: Option<String>,
    /// Exact event name as reported by the feed, only used for matching.
    pub feed_name: Option<String>,
    pub name: String,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub status: TournamentStatus,
    pub picks_locked: bool,
    pub last_synced_at: Option<DateTimeUtc>,
    pub entry_price: Option<i32>,
    pub three_entry_price: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tournament_field::Entity")]
    TournamentField,
    #[sea_orm(has_many = "super::tournament_result::Entity")]
    TournamentResult,
    #[sea_orm(has_many = "super::entry::Entity")]
    Entry,
    #[sea_orm(has_many = "super::standing::Entity")]
    Standing,
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

impl Related<super::entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entry.def()
    }
}

impl Related<super::standing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Standing.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Names the feed may use for this tournament: the stored feed name and the local one.
    pub fn known_names(&self) -> impl Iterator<Item = &str> {
        self.feed_name
            .as_deref()
            .into_iter()
            .chain(std::iter::once(self.name.as_str()))
    }
}
