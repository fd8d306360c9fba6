use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use entity::prelude::*;
use entity::sea_orm_active_enums::TournamentStatus;
use entity::*;
use itertools::Itertools;
use log::info;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::Set;
use sea_orm::QuerySelect;

use crate::context::AppContext;
use crate::error::GenericError;
use crate::feed::ScheduledEvent;

/// Tournaments run Thursday to Sunday.
const EVENT_LENGTH_DAYS: u64 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleSync {
    pub inserted: usize,
    pub updated: usize,
}

fn end_date(start: NaiveDate) -> Option<NaiveDate> {
    start.checked_add_days(Days::new(EVENT_LENGTH_DAYS))
}

/// Underway and upcoming events in schedule order, capped at `limit`. An event
/// that already ended would be activated by the lifecycle jobs and never
/// completed, since the live feed has moved on.
fn relevant_events(events: Vec<ScheduledEvent>, today: NaiveDate, limit: usize) -> Vec<ScheduledEvent> {
    events
        .into_iter()
        .filter(|e| {
            e.start_date
                .and_then(end_date)
                .map_or(true, |end| end >= today)
        })
        .unique_by(|e| e.event_id.clone())
        .take(limit)
        .collect()
}

/// Inserts unknown events as upcoming tournaments and refreshes the feed name
/// and dates of known ones. Status, lock and pricing are never touched.
pub async fn sync_schedule(ctx: &AppContext) -> Result<ScheduleSync, GenericError> {
    let events = ctx.feed.schedule(&ctx.settings.tour).await?;
    let events = relevant_events(events, ctx.today(), ctx.settings.schedule_sync_limit);
    if events.is_empty() {
        info!("Schedule sync found no upcoming events");
        return Ok(ScheduleSync::default());
    }

    let ids = events.iter().map(|e| e.event_id.clone()).collect_vec();
    let known: HashSet<String> = Tournament::find()
        .select_only()
        .column(tournament::Column::ExternalId)
        .filter(tournament::Column::ExternalId.is_in(ids))
        .into_tuple::<Option<String>>()
        .all(&ctx.db)
        .await?
        .into_iter()
        .flatten()
        .collect();

    let now = ctx.now();
    let rows = events.iter().map(|e| tournament::ActiveModel {
        external_id: Set(Some(e.event_id.clone())),
        feed_name: Set(Some(e.event_name.clone())),
        name: Set(e.event_name.clone()),
        start_date: Set(e.start_date),
        end_date: Set(e.start_date.and_then(end_date)),
        status: Set(TournamentStatus::Upcoming),
        picks_locked: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    });
    Tournament::insert_many(rows)
        .on_conflict(
            OnConflict::column(tournament::Column::ExternalId)
                .update_columns([
                    tournament::Column::FeedName,
                    tournament::Column::StartDate,
                    tournament::Column::EndDate,
                    tournament::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(&ctx.db)
        .await?;

    let outcome = ScheduleSync {
        inserted: events.len() - known.len(),
        updated: known.len(),
    };
    info!(
        "Schedule sync: {} new, {} updated tournaments",
        outcome.inserted, outcome.updated
    );
    Ok(outcome)
}
