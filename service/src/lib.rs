pub mod clock;
pub mod config;
pub mod context;
pub mod db;
pub mod entries;
pub mod error;
pub mod feed;
pub mod jobs;
pub mod lifecycle;
pub mod notify;
pub mod purse;
pub mod query;
pub mod reconcile;
pub mod scheduler;
pub mod scoring;
pub mod sync;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use context::AppContext;
pub use error::GenericError;
pub use sea_orm;
