pub use super::entry::Entity as Entry;
pub use super::golfer::Entity as Golfer;
pub use super::standing::Entity as Standing;
pub use super::tournament::Entity as Tournament;
pub use super::tournament_field::Entity as TournamentField;
pub use super::tournament_result::Entity as TournamentResult;
pub use super::user::Entity as User;
