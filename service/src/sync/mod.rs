//! Feed-to-store synchronisation. Every write here is keyed by the feed's
//! external ids or fully replaces one tournament's rows, so overlapping runs
//! converge on the same state.

mod field;
mod golfers;
mod results;
mod schedule;

pub use field::{assign_tiers, auto_assign_field, move_tier, tier_for_rank};
pub use golfers::sync_golfers;
pub use results::{
    apply_live_snapshot, event_finished, map_live_rows, parse_position, sync_results,
    ParsedPosition, ResultSync,
};
pub use schedule::{sync_schedule, ScheduleSync};

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use entity::sea_orm_active_enums::TournamentStatus;
use entity::tournament;
use log::{error, info, warn};

use crate::context::AppContext;
use crate::error::GenericError;
use crate::query;

/// Golfer roster and schedule in one go, as the admin "sync" button does.
pub async fn full_sync(ctx: &AppContext) -> Result<String, GenericError> {
    let golfers = sync_golfers(ctx).await?;
    let schedule = sync_schedule(ctx).await?;
    Ok(format!(
        "Synced {golfers} golfers, {} new and {} updated tournaments",
        schedule.inserted, schedule.updated
    ))
}

/// Remembers when each tournament's scores were last refreshed by hand.
pub struct RefreshLimiter {
    cooldown: Duration,
    last_refresh: Mutex<HashMap<i32, DateTime<Utc>>>,
}

impl RefreshLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_refresh: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, tournament_id: i32, now: DateTime<Utc>) -> Result<(), GenericError> {
        let last = self
            .last_refresh
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&tournament_id)
            .copied();
        let Some(last) = last else {
            return Ok(());
        };
        let elapsed = (now - last).to_std().unwrap_or_default();
        if elapsed < self.cooldown {
            let wait = (self.cooldown - elapsed).as_secs().max(1);
            return Err(GenericError::RateLimited(format!(
                "Scores were just refreshed, try again in {wait} seconds"
            )));
        }
        Ok(())
    }

    pub fn record(&self, tournament_id: i32, now: DateTime<Utc>) {
        self.last_refresh
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(tournament_id, now);
    }
}

/// How long stored scores of a finished round are trusted without asking the feed.
const SETTLED_ROUND_MINS: i64 = 30;

/// The round the stored results show as played out by everyone on the course,
/// when the last sync is recent enough to trust it.
async fn settled_round(
    ctx: &AppContext,
    tournament: &tournament::Model,
) -> Result<Option<i32>, GenericError> {
    let recent = tournament
        .last_synced_at
        .is_some_and(|last| ctx.now() - last < chrono::Duration::minutes(SETTLED_ROUND_MINS));
    if !recent {
        return Ok(None);
    }
    let results = query::results(&ctx.db, tournament.id).await?;
    let mut holes = results.iter().filter_map(|r| r.thru).peekable();
    if holes.peek().is_none() || holes.any(|h| h < 18) {
        return Ok(None);
    }
    Ok(Some(results.iter().filter_map(|r| r.round_num).max().unwrap_or(1)))
}

/// User-triggered score refresh, at most one successful sync per tournament per cooldown.
/// Between rounds the stored scores are final and the feed is left alone.
pub async fn manual_refresh(ctx: &AppContext, tournament_id: i32) -> Result<String, GenericError> {
    let now = ctx.now();
    ctx.refresh_limiter.check(tournament_id, now)?;
    let tournament = query::tournament(&ctx.db, tournament_id).await?;
    if let Some(round) = settled_round(ctx, &tournament).await? {
        info!("Round {} of '{}' is complete, skipping refresh", round, tournament.name);
        return Ok(format!(
            "Round {round} complete. All players finished - scores are final."
        ));
    }
    let outcome = sync_results(ctx, tournament_id).await?;
    ctx.refresh_limiter.record(tournament_id, now);
    Ok(format!("Scores updated ({} golfers)", outcome.rows))
}

fn is_stale(ctx: &AppContext, tournament: &tournament::Model) -> bool {
    tournament.status == TournamentStatus::Active
        && tournament
            .last_synced_at
            .map_or(true, |last| ctx.now() - last > ctx.settings.auto_sync_after)
}

/// Syncs an active tournament's results before it is viewed when they are
/// older than the configured threshold. Returns a message worth showing the
/// viewer, if any. Feed failures are logged and the stored data is served.
pub async fn refresh_if_stale(
    ctx: &AppContext,
    tournament_id: i32,
) -> Result<Option<String>, GenericError> {
    let tournament = query::tournament(&ctx.db, tournament_id).await?;
    if !is_stale(ctx, &tournament) {
        return Ok(None);
    }
    info!("Results for '{}' are stale, syncing before view", tournament.name);
    match sync_results(ctx, tournament_id).await {
        Ok(_) => Ok(None),
        Err(GenericError::TournamentMismatch(msg)) => {
            warn!("Auto-sync skipped: {}", msg);
            Ok(Some(format!("Live scores unavailable: {msg}")))
        }
        Err(e) => {
            error!("Auto-sync of tournament {} failed: {}", tournament_id, e);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{LiveRow, LiveSnapshot, Thru};
    use crate::testing::{insert_golfer, insert_tournament, test_league, TestLeague};
    use chrono::TimeZone;

    fn live(event: &str, round: i32, rows: &[(&str, &str, i32, Thru)]) -> LiveSnapshot {
        LiveSnapshot {
            event_name: event.to_string(),
            current_round: Some(round),
            live_stats: rows
                .iter()
                .map(|(id, position, total, thru)| LiveRow {
                    player_id: id.to_string(),
                    player_name: None,
                    position: Some(position.to_string()),
                    total: Some(*total),
                    thru: Some(*thru),
                    round: Some(round),
                })
                .collect(),
        }
    }

    fn mid_round() -> LiveSnapshot {
        live(
            "The Masters Tournament",
            2,
            &[("1", "1", -8, Thru::Holes(12)), ("2", "T2", -5, Thru::Holes(9))],
        )
    }

    async fn masters_league() -> (TestLeague, tournament::Model) {
        let league = test_league().await;
        let masters =
            insert_tournament(&league.ctx.db, "Masters Tournament", TournamentStatus::Active).await;
        insert_golfer(&league.ctx.db, "1", "Scheffler, Scottie", Some(3.0)).await;
        insert_golfer(&league.ctx.db, "2", "McIlroy, Rory", Some(2.5)).await;
        (league, masters)
    }

    #[test]
    fn limiter_blocks_inside_cooldown() {
        let limiter = RefreshLimiter::new(Duration::from_secs(60));
        let t0 = Utc.with_ymd_and_hms(2025, 4, 12, 18, 0, 0).unwrap();
        assert!(limiter.check(7, t0).is_ok());
        limiter.record(7, t0);

        let err = limiter.check(7, t0 + chrono::Duration::seconds(20)).unwrap_err();
        assert!(matches!(err, GenericError::RateLimited(ref m) if m.contains("40 seconds")));
        assert!(limiter.check(8, t0).is_ok());
        assert!(limiter.check(7, t0 + chrono::Duration::seconds(60)).is_ok());
    }

    #[tokio::test]
    async fn stale_results_are_synced_before_view() {
        let (league, masters) = masters_league().await;
        let ctx = &league.ctx;
        league.feed.set_live(mid_round());

        assert_eq!(refresh_if_stale(ctx, masters.id).await.unwrap(), None);
        let synced = query::tournament(&ctx.db, masters.id).await.unwrap();
        assert_eq!(synced.last_synced_at, Some(ctx.now()));
        assert_eq!(query::results(&ctx.db, masters.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn fresh_results_do_not_touch_the_feed() {
        let (league, masters) = masters_league().await;
        let ctx = &league.ctx;
        league.feed.set_live(mid_round());
        sync_results(ctx, masters.id).await.unwrap();
        let synced_at = ctx.now();

        league.clock.advance(chrono::Duration::minutes(5));
        league.feed.set_live(live("RBC Heritage", 1, &[]));
        assert_eq!(refresh_if_stale(ctx, masters.id).await.unwrap(), None);
        let t = query::tournament(&ctx.db, masters.id).await.unwrap();
        assert_eq!(t.last_synced_at, Some(synced_at));
    }

    #[tokio::test]
    async fn offline_feed_serves_stored_results() {
        let (league, masters) = masters_league().await;
        let ctx = &league.ctx;
        league.feed.set_live(mid_round());
        sync_results(ctx, masters.id).await.unwrap();
        let before = query::results(&ctx.db, masters.id).await.unwrap();
        let synced_at = ctx.now();

        league.clock.advance(chrono::Duration::minutes(11));
        league.feed.set_offline(true);
        assert_eq!(refresh_if_stale(ctx, masters.id).await.unwrap(), None);
        assert_eq!(query::results(&ctx.db, masters.id).await.unwrap(), before);
        let t = query::tournament(&ctx.db, masters.id).await.unwrap();
        assert_eq!(t.last_synced_at, Some(synced_at));
    }

    #[tokio::test]
    async fn other_event_on_the_feed_gives_a_notice() {
        let (league, masters) = masters_league().await;
        let ctx = &league.ctx;
        league.feed.set_live(live(
            "RBC Heritage",
            1,
            &[("1", "1", -3, Thru::Holes(6))],
        ));

        let notice = refresh_if_stale(ctx, masters.id).await.unwrap().unwrap();
        assert!(notice.starts_with("Live scores unavailable"));
        assert!(notice.contains("RBC Heritage"));
        assert!(query::results(&ctx.db, masters.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_manual_refresh_keeps_the_cooldown_free() {
        let (league, masters) = masters_league().await;
        let ctx = &league.ctx;
        league.feed.set_offline(true);
        assert!(matches!(
            manual_refresh(ctx, masters.id).await,
            Err(GenericError::Feed(_))
        ));

        league.feed.set_offline(false);
        league.feed.set_live(mid_round());
        assert_eq!(
            manual_refresh(ctx, masters.id).await.unwrap(),
            "Scores updated (2 golfers)"
        );
        assert!(matches!(
            manual_refresh(ctx, masters.id).await,
            Err(GenericError::RateLimited(_))
        ));
    }

    #[tokio::test]
    async fn finished_round_is_not_refetched_for_a_while() {
        let (league, masters) = masters_league().await;
        let ctx = &league.ctx;
        league.feed.set_live(live(
            "The Masters Tournament",
            2,
            &[("1", "1", -8, Thru::Finished), ("2", "T2", -5, Thru::Holes(18))],
        ));
        manual_refresh(ctx, masters.id).await.unwrap();

        league.clock.advance(chrono::Duration::minutes(2));
        league.feed.set_offline(true);
        assert_eq!(
            manual_refresh(ctx, masters.id).await.unwrap(),
            "Round 2 complete. All players finished - scores are final."
        );

        league.clock.advance(chrono::Duration::minutes(30));
        assert!(matches!(
            manual_refresh(ctx, masters.id).await,
            Err(GenericError::Feed(_))
        ));
    }
}
