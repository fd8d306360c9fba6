//! Fakes for exercising the league without the network or a database server.

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, TimeZone, Utc};
use entity::sea_orm_active_enums::TournamentStatus;
use entity::*;
use migration::{Migrator, MigratorTrait};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ConnectOptions, ConnectionTrait};

use crate::clock::ManualClock;
use crate::config::Settings;
use crate::context::AppContext;
use crate::db::{ResilientConnection, UrlConnector};
use crate::error::GenericError;
use crate::feed::{FeedPlayer, FieldSnapshot, GolfFeed, LiveSnapshot, Ranking, ScheduledEvent};
use crate::notify::Notifier;

#[derive(Debug, Default)]
struct FeedState {
    schedule: Vec<ScheduledEvent>,
    field: Option<FieldSnapshot>,
    players: Vec<FeedPlayer>,
    rankings: Vec<Ranking>,
    live: Option<LiveSnapshot>,
    offline: bool,
}

/// Feed that serves whatever the test last handed it. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
    state: Arc<Mutex<FeedState>>,
}

impl StaticFeed {
    fn state(&self) -> std::sync::MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_schedule(&self, events: Vec<ScheduledEvent>) {
        self.state().schedule = events;
    }

    pub fn set_field(&self, field: FieldSnapshot) {
        self.state().field = Some(field);
    }

    pub fn set_players(&self, players: Vec<FeedPlayer>) {
        self.state().players = players;
    }

    pub fn set_rankings(&self, rankings: Vec<Ranking>) {
        self.state().rankings = rankings;
    }

    pub fn set_live(&self, live: LiveSnapshot) {
        self.state().live = Some(live);
    }

    /// Every call fails while offline.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    fn guard(&self) -> Result<(), GenericError> {
        if self.state().offline {
            return Err(GenericError::Feed("feed is offline".to_string()));
        }
        Ok(())
    }
}

#[rocket::async_trait]
impl GolfFeed for StaticFeed {
    async fn schedule(&self, _tour: &str) -> Result<Vec<ScheduledEvent>, GenericError> {
        self.guard()?;
        Ok(self.state().schedule.clone())
    }

    async fn field(&self, _tour: &str) -> Result<FieldSnapshot, GenericError> {
        self.guard()?;
        self.state()
            .field
            .clone()
            .ok_or_else(|| GenericError::Feed("no field published".to_string()))
    }

    async fn player_list(&self) -> Result<Vec<FeedPlayer>, GenericError> {
        self.guard()?;
        Ok(self.state().players.clone())
    }

    async fn rankings(&self) -> Result<Vec<Ranking>, GenericError> {
        self.guard()?;
        Ok(self.state().rankings.clone())
    }

    async fn live_stats(&self, _tour: &str) -> Result<LiveSnapshot, GenericError> {
        self.guard()?;
        self.state()
            .live
            .clone()
            .ok_or_else(|| GenericError::Feed("no live stats published".to_string()))
    }
}

/// Keeps every message instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[rocket::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), GenericError> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
        Ok(())
    }
}

pub const TEST_ADMIN_KEY: &str = "test-admin";

pub fn test_settings() -> Settings {
    Settings::from_lookup(|key| match key {
        "DATABASE_URL" => Some("sqlite::memory:".to_string()),
        "DATAGOLF_API_KEY" => Some("test".to_string()),
        "LEAGUE_TIMEZONE" => Some("UTC".to_string()),
        "ADMIN_KEY" => Some(TEST_ADMIN_KEY.to_string()),
        _ => None,
    })
    .expect("test settings are valid")
}

/// Migrated in-memory SQLite. A single pooled connection keeps every query on
/// the same database.
pub async fn memory_db() -> ResilientConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = ResilientConnection::connect(Arc::new(UrlConnector(options)))
        .await
        .expect("in-memory database");
    Migrator::up(db.current().as_ref(), None)
        .await
        .expect("migrations apply");
    db
}

pub struct TestLeague {
    pub ctx: AppContext,
    pub feed: StaticFeed,
    pub notifier: RecordingNotifier,
    pub clock: Arc<ManualClock>,
}

/// League on Tuesday 2025-04-08 12:00 UTC with an empty database.
pub async fn test_league() -> TestLeague {
    let feed = StaticFeed::default();
    let notifier = RecordingNotifier::default();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 4, 8, 12, 0, 0)
            .single()
            .expect("valid start"),
    ));
    let ctx = AppContext::new(
        memory_db().await,
        Arc::new(feed.clone()),
        Arc::new(notifier.clone()),
        clock.clone(),
        test_settings(),
    );
    TestLeague {
        ctx,
        feed,
        notifier,
        clock,
    }
}

pub async fn memory_context(feed: StaticFeed) -> AppContext {
    let mut league = test_league().await;
    league.ctx.feed = Arc::new(feed);
    league.ctx
}

pub async fn insert_tournament(
    db: &impl ConnectionTrait,
    name: &str,
    status: TournamentStatus,
) -> tournament::Model {
    let now = Utc::now();
    tournament::ActiveModel {
        name: Set(name.to_string()),
        status: Set(status),
        picks_locked: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("tournament inserted")
}

/// Upcoming tournament running four days from `start`.
pub async fn insert_tournament_starting(
    db: &impl ConnectionTrait,
    name: &str,
    start: NaiveDate,
) -> tournament::Model {
    let now = Utc::now();
    tournament::ActiveModel {
        name: Set(name.to_string()),
        start_date: Set(Some(start)),
        end_date: Set(Some(start + chrono::Duration::days(3))),
        status: Set(TournamentStatus::Upcoming),
        picks_locked: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("tournament inserted")
}

pub async fn insert_golfer(
    db: &impl ConnectionTrait,
    external_id: &str,
    name: &str,
    skill_estimate: Option<f64>,
) -> golfer::Model {
    golfer::ActiveModel {
        external_id: Set(Some(external_id.to_string())),
        name: Set(name.to_string()),
        country: Set(None),
        skill_estimate: Set(skill_estimate),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("golfer inserted")
}

pub async fn insert_user(db: &impl ConnectionTrait, username: &str) -> user::Model {
    user::ActiveModel {
        username: Set(username.to_string()),
        display_name: Set(None),
        is_admin: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("user inserted")
}
