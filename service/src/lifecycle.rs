//! Tournament status transitions: upcoming -> active -> completed, plus the
//! independent picks lock. Automatic transitions are conditional updates on the
//! expected current state, so re-running a check never moves a tournament twice.

use chrono::{Days, NaiveDate};
use entity::prelude::*;
use entity::sea_orm_active_enums::TournamentStatus;
use entity::*;
use log::{error, info};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

use crate::context::AppContext;
use crate::error::GenericError;
use crate::{notify, query, scoring, sync};

/// Tournaments open for picks on the Tuesday of a Thursday-start week.
const ACTIVATE_DAYS_BEFORE_START: u64 = 2;

pub fn should_activate(tournament: &tournament::Model, today: NaiveDate) -> bool {
    tournament.status == TournamentStatus::Upcoming
        && tournament
            .start_date
            .and_then(|start| start.checked_sub_days(Days::new(ACTIVATE_DAYS_BEFORE_START)))
            .is_some_and(|opens| today >= opens)
}

pub fn should_lock(tournament: &tournament::Model, today: NaiveDate) -> bool {
    tournament.status == TournamentStatus::Active
        && !tournament.picks_locked
        && tournament.start_date.is_some_and(|start| today >= start)
}

/// Activates every upcoming tournament whose week has begun.
pub async fn activate_due(ctx: &AppContext) -> Result<Vec<String>, GenericError> {
    let today = ctx.today();
    let mut activated = Vec::new();
    for t in query::tournaments_with_status(&ctx.db, TournamentStatus::Upcoming).await? {
        if !should_activate(&t, today) {
            continue;
        }
        let res = Tournament::update_many()
            .set(tournament::ActiveModel {
                status: Set(TournamentStatus::Active),
                updated_at: Set(ctx.now()),
                ..Default::default()
            })
            .filter(tournament::Column::Id.eq(t.id))
            .filter(tournament::Column::Status.eq(TournamentStatus::Upcoming))
            .exec(&ctx.db)
            .await?;
        if res.rows_affected == 1 {
            info!("Activated tournament '{}' (starts {:?})", t.name, t.start_date);
            activated.push(t.name);
        }
    }
    Ok(activated)
}

/// Locks picks of every active tournament that has started.
pub async fn lock_due(ctx: &AppContext) -> Result<Vec<String>, GenericError> {
    let today = ctx.today();
    let mut locked = Vec::new();
    for t in query::tournaments_with_status(&ctx.db, TournamentStatus::Active).await? {
        if !should_lock(&t, today) {
            continue;
        }
        let res = Tournament::update_many()
            .set(tournament::ActiveModel {
                picks_locked: Set(true),
                updated_at: Set(ctx.now()),
                ..Default::default()
            })
            .filter(tournament::Column::Id.eq(t.id))
            .filter(tournament::Column::Status.eq(TournamentStatus::Active))
            .filter(tournament::Column::PicksLocked.eq(false))
            .exec(&ctx.db)
            .await?;
        if res.rows_affected == 1 {
            info!("Locked picks for tournament '{}'", t.name);
            locked.push(t.name);
        }
    }
    Ok(locked)
}

/// Moves an active tournament to completed. Only the call that performs the
/// transition sends the final leaderboard.
pub async fn mark_completed(ctx: &AppContext, tournament_id: i32) -> Result<bool, GenericError> {
    let res = Tournament::update_many()
        .set(tournament::ActiveModel {
            status: Set(TournamentStatus::Completed),
            updated_at: Set(ctx.now()),
            ..Default::default()
        })
        .filter(tournament::Column::Id.eq(tournament_id))
        .filter(tournament::Column::Status.eq(TournamentStatus::Active))
        .exec(&ctx.db)
        .await?;
    if res.rows_affected != 1 {
        return Ok(false);
    }
    info!("Tournament {} completed", tournament_id);
    if let Err(e) = notify::announce_leaderboard(ctx, tournament_id).await {
        error!("Could not build final leaderboard for tournament {}: {}", tournament_id, e);
    }
    Ok(true)
}

/// Completes active tournaments the live feed reports as finished. The final
/// snapshot is written and scored before the status changes.
pub async fn complete_finished(ctx: &AppContext) -> Result<Vec<String>, GenericError> {
    let active = query::tournaments_with_status(&ctx.db, TournamentStatus::Active).await?;
    if active.is_empty() {
        return Ok(Vec::new());
    }
    let snapshot = ctx.feed.live_stats(&ctx.settings.tour).await?;
    info!(
        "Live feed event: '{}', round {:?}",
        snapshot.event_name, snapshot.current_round
    );
    if !sync::event_finished(&snapshot) {
        return Ok(Vec::new());
    }

    let mut completed = Vec::new();
    for t in active {
        if !crate::reconcile::matches_any(t.known_names(), &snapshot.event_name) {
            continue;
        }
        sync::apply_live_snapshot(ctx, &t, &snapshot).await?;
        scoring::calculate_standings(ctx, t.id).await?;
        if mark_completed(ctx, t.id).await? {
            completed.push(t.name);
        }
    }
    Ok(completed)
}

/// Admin override: makes one tournament the active one. Any other active
/// tournament goes back to upcoming with its picks unlocked, a completed
/// tournament is never touched.
pub async fn force_activate(ctx: &AppContext, tournament_id: i32) -> Result<String, GenericError> {
    let target = query::tournament(&ctx.db, tournament_id).await?;
    if target.status == TournamentStatus::Completed {
        return Err(GenericError::Conflict("A completed tournament cannot be reactivated"));
    }
    let now = ctx.now();
    let reverted = ctx
        .db
        .transaction(move |txn| {
            Box::pin(async move {
                let reverted = Tournament::update_many()
                    .set(tournament::ActiveModel {
                        status: Set(TournamentStatus::Upcoming),
                        picks_locked: Set(false),
                        updated_at: Set(now),
                        ..Default::default()
                    })
                    .filter(tournament::Column::Status.eq(TournamentStatus::Active))
                    .filter(tournament::Column::Id.ne(tournament_id))
                    .exec(txn)
                    .await?;
                Tournament::update_many()
                    .set(tournament::ActiveModel {
                        status: Set(TournamentStatus::Active),
                        updated_at: Set(now),
                        ..Default::default()
                    })
                    .filter(tournament::Column::Id.eq(tournament_id))
                    .filter(tournament::Column::Status.ne(TournamentStatus::Completed))
                    .exec(txn)
                    .await?;
                Ok(reverted.rows_affected)
            })
        })
        .await?;
    info!(
        "Force-activated '{}' ({} other tournament(s) reverted to upcoming)",
        target.name, reverted
    );
    Ok(format!("{} is now the active tournament", target.name))
}

/// Admin override: completes an active tournament without asking the feed.
pub async fn force_complete(ctx: &AppContext, tournament_id: i32) -> Result<String, GenericError> {
    let target = query::tournament(&ctx.db, tournament_id).await?;
    match target.status {
        TournamentStatus::Completed => Ok(format!("{} was already completed", target.name)),
        TournamentStatus::Upcoming => Err(GenericError::Conflict(
            "Only an active tournament can be completed",
        )),
        TournamentStatus::Active => {
            scoring::calculate_standings(ctx, tournament_id).await?;
            mark_completed(ctx, tournament_id).await?;
            Ok(format!("{} marked completed", target.name))
        }
    }
}

/// Flips the picks lock. Picks can only be locked once the tournament is active.
pub async fn toggle_lock(ctx: &AppContext, tournament_id: i32) -> Result<bool, GenericError> {
    let target = query::tournament(&ctx.db, tournament_id).await?;
    let locked = !target.picks_locked;
    if locked && target.status == TournamentStatus::Upcoming {
        return Err(GenericError::Conflict(
            "Picks can only be locked for an active tournament",
        ));
    }
    Tournament::update_many()
        .set(tournament::ActiveModel {
            picks_locked: Set(locked),
            updated_at: Set(ctx.now()),
            ..Default::default()
        })
        .filter(tournament::Column::Id.eq(tournament_id))
        .exec(&ctx.db)
        .await?;
    info!(
        "Picks for '{}' {}",
        target.name,
        if locked { "locked" } else { "unlocked" }
    );
    Ok(locked)
}
