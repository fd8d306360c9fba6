//! `SeaORM` Entity definitions for the pick'em league.

pub mod prelude;

pub mod entry;
pub mod golfer;
pub mod sea_orm_active_enums;
pub mod standing;
pub mod tournament;
pub mod tournament_field;
pub mod tournament_result;
pub mod user;
