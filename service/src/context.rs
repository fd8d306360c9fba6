use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use sea_orm::ConnectOptions;

use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::db::{ResilientConnection, UrlConnector};
use crate::error::GenericError;
use crate::feed::{DataGolfClient, GolfFeed};
use crate::notify::{GroupMeNotifier, Notifier};
use crate::sync::RefreshLimiter;

/// Everything the league's operations need, built once at start-up and handed
/// to the web layer and the scheduler alike.
#[derive(Clone)]
pub struct AppContext {
    pub db: ResilientConnection,
    pub feed: Arc<dyn GolfFeed>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub settings: Arc<Settings>,
    pub refresh_limiter: Arc<RefreshLimiter>,
}

impl AppContext {
    pub fn new(
        db: ResilientConnection,
        feed: Arc<dyn GolfFeed>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: Settings,
    ) -> Self {
        let refresh_limiter = Arc::new(RefreshLimiter::new(settings.refresh_cooldown));
        Self {
            db,
            feed,
            notifier,
            clock,
            settings: Arc::new(settings),
            refresh_limiter,
        }
    }

    /// Production wiring: DataGolf feed, GroupMe sink, system clock.
    pub async fn from_settings(settings: Settings) -> Result<Self, GenericError> {
        let mut options = ConnectOptions::new(settings.database_url.clone());
        options.sqlx_logging(false);
        let db = ResilientConnection::connect(Arc::new(UrlConnector(options))).await?;
        info!("Connected to {:?} database", sea_orm::ConnectionTrait::get_database_backend(&db));

        let feed = Arc::new(DataGolfClient::from_settings(&settings)?);
        let notifier = Arc::new(GroupMeNotifier::from_settings(&settings)?);
        Ok(Self::new(db, feed, notifier, Arc::new(SystemClock), settings))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Calendar date in the league's timezone.
    pub fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.settings.timezone).date_naive()
    }
}
