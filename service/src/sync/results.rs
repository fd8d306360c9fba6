use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use entity::prelude::*;
use entity::sea_orm_active_enums::ResultStatus;
use entity::*;
use log::{info, warn};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use sea_orm::QuerySelect;

use crate::context::AppContext;
use crate::db::BATCH_SIZE;
use crate::error::GenericError;
use crate::feed::LiveSnapshot;
use crate::{query, reconcile, scoring};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedPosition {
    Placed(i32),
    Cut,
    Withdrawn,
    Disqualified,
    /// Empty or unrecognised, e.g. before the golfer tees off.
    Unplaced,
}

/// Reads the feed's textual position: "1", "T5", "CUT"/"MC", "WD"/"W/D", "DQ".
pub fn parse_position(raw: &str) -> ParsedPosition {
    let raw = raw.trim();
    let numeric = raw.replace(['T', 't'], "");
    let numeric = numeric.trim();
    if !numeric.is_empty() && numeric.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(position) = numeric.parse() {
            return ParsedPosition::Placed(position);
        }
    }
    match raw.to_uppercase().as_str() {
        "CUT" | "MC" => ParsedPosition::Cut,
        "WD" | "W/D" => ParsedPosition::Withdrawn,
        "DQ" => ParsedPosition::Disqualified,
        _ => ParsedPosition::Unplaced,
    }
}

/// The event is over when the feed has moved past round 4, or when it is in
/// round 4 and every placed golfer has finished 18 holes.
pub fn event_finished(snapshot: &LiveSnapshot) -> bool {
    match snapshot.current_round {
        Some(round) if round >= 5 => true,
        Some(4) => {
            let mut placed = snapshot.live_stats.iter().filter(|row| {
                matches!(
                    row.position.as_deref().map(parse_position),
                    Some(ParsedPosition::Placed(_))
                )
            });
            let mut any = false;
            let all_done = placed.all(|row| {
                any = true;
                row.thru.is_some_and(|t| t.finished_round())
            });
            any && all_done
        }
        _ => false,
    }
}

/// Maps live rows onto known golfers. Rows for golfers we do not know are
/// skipped, only the first row per golfer is kept.
pub fn map_live_rows(
    snapshot: &LiveSnapshot,
    golfer_ids: &HashMap<String, i32>,
    tournament_id: i32,
    now: DateTime<Utc>,
) -> Vec<tournament_result::ActiveModel> {
    let finished = event_finished(snapshot);
    let mut seen = HashSet::new();
    snapshot
        .live_stats
        .iter()
        .filter_map(|row| {
            let golfer_id = *golfer_ids.get(&row.player_id)?;
            if !seen.insert(golfer_id) {
                return None;
            }
            let (position, status) = match row.position.as_deref().map(parse_position) {
                Some(ParsedPosition::Placed(p)) if finished => (Some(p), ResultStatus::Finished),
                Some(ParsedPosition::Placed(p)) => (Some(p), ResultStatus::Active),
                Some(ParsedPosition::Cut) => (None, ResultStatus::Cut),
                Some(ParsedPosition::Withdrawn) => (None, ResultStatus::Withdrawn),
                Some(ParsedPosition::Disqualified) => (None, ResultStatus::Disqualified),
                Some(ParsedPosition::Unplaced) | None => (None, ResultStatus::Active),
            };
            Some(tournament_result::ActiveModel {
                tournament_id: Set(tournament_id),
                golfer_id: Set(golfer_id),
                position: Set(position),
                score_to_par: Set(row.total),
                status: Set(status),
                round_num: Set(row.round),
                thru: Set(row.thru.map(|t| t.holes())),
                updated_at: Set(now),
                ..Default::default()
            })
        })
        .collect()
}

async fn golfer_ids_by_external(
    db: &impl ConnectionTrait,
    external_ids: Vec<String>,
) -> Result<HashMap<String, i32>, DbErr> {
    if external_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(Option<String>, i32)> = Golfer::find()
        .select_only()
        .column(golfer::Column::ExternalId)
        .column(golfer::Column::Id)
        .filter(golfer::Column::ExternalId.is_in(external_ids))
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(external, id)| Some((external?, id)))
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultSync {
    pub rows: usize,
    pub event_finished: bool,
}

/// Replaces a tournament's results with one live snapshot, after checking the
/// snapshot really is about this tournament. A snapshot that maps to no known
/// golfer leaves the stored results alone.
pub async fn apply_live_snapshot(
    ctx: &AppContext,
    tournament: &tournament::Model,
    snapshot: &LiveSnapshot,
) -> Result<ResultSync, GenericError> {
    if !reconcile::matches_any(tournament.known_names(), &snapshot.event_name) {
        warn!(
            "Result sync for '{}' aborted, feed reports '{}'",
            tournament.name, snapshot.event_name
        );
        return Err(GenericError::mismatch(&snapshot.event_name, &tournament.name));
    }

    let now = ctx.now();
    let external_ids = snapshot
        .live_stats
        .iter()
        .map(|row| row.player_id.clone())
        .collect();
    let golfer_ids = golfer_ids_by_external(&ctx.db, external_ids).await?;
    let rows = map_live_rows(snapshot, &golfer_ids, tournament.id, now);
    let finished = event_finished(snapshot);
    if rows.is_empty() {
        warn!(
            "Live feed for '{}' matched no known golfers, keeping stored results",
            tournament.name
        );
        return Ok(ResultSync {
            rows: 0,
            event_finished: finished,
        });
    }

    let count = rows.len();
    let tournament_id = tournament.id;
    ctx.db
        .transaction(move |txn| {
            let rows = rows.clone();
            Box::pin(async move {
                TournamentResult::delete_many()
                    .filter(tournament_result::Column::TournamentId.eq(tournament_id))
                    .exec(txn)
                    .await?;
                for chunk in rows.chunks(BATCH_SIZE) {
                    TournamentResult::insert_many(chunk.iter().cloned())
                        .exec_without_returning(txn)
                        .await?;
                }
                Tournament::update_many()
                    .set(tournament::ActiveModel {
                        last_synced_at: Set(Some(now)),
                        updated_at: Set(now),
                        ..Default::default()
                    })
                    .filter(tournament::Column::Id.eq(tournament_id))
                    .exec(txn)
                    .await?;
                Ok(())
            })
        })
        .await?;
    info!(
        "Replaced results for '{}': {} golfers{}",
        tournament.name,
        count,
        if finished { ", event finished" } else { "" }
    );
    Ok(ResultSync {
        rows: count,
        event_finished: finished,
    })
}

/// Fetches live stats for a tournament, replaces its results and recomputes standings.
pub async fn sync_results(ctx: &AppContext, tournament_id: i32) -> Result<ResultSync, GenericError> {
    let tournament = query::tournament(&ctx.db, tournament_id).await?;
    let snapshot = ctx.feed.live_stats(&ctx.settings.tour).await?;
    let outcome = apply_live_snapshot(ctx, &tournament, &snapshot).await?;
    scoring::calculate_standings(ctx, tournament_id).await?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::feed::{LiveRow, Thru};
    use crate::testing::{insert_golfer, insert_tournament, test_league};
    use entity::sea_orm_active_enums::TournamentStatus;

    fn row(id: &str, position: &str, total: i32, thru: Option<Thru>) -> LiveRow {
        LiveRow {
            player_id: id.to_string(),
            player_name: None,
            position: Some(position.to_string()),
            total: Some(total),
            thru,
            round: Some(4),
        }
    }

    fn snapshot(event: &str, round: i32, rows: Vec<LiveRow>) -> LiveSnapshot {
        LiveSnapshot {
            event_name: event.to_string(),
            current_round: Some(round),
            live_stats: rows,
        }
    }

    #[test]
    fn positions() {
        assert_eq!(parse_position("1"), ParsedPosition::Placed(1));
        assert_eq!(parse_position("T5"), ParsedPosition::Placed(5));
        assert_eq!(parse_position(" t12 "), ParsedPosition::Placed(12));
        assert_eq!(parse_position("CUT"), ParsedPosition::Cut);
        assert_eq!(parse_position("mc"), ParsedPosition::Cut);
        assert_eq!(parse_position("WD"), ParsedPosition::Withdrawn);
        assert_eq!(parse_position("W/D"), ParsedPosition::Withdrawn);
        assert_eq!(parse_position("DQ"), ParsedPosition::Disqualified);
        assert_eq!(parse_position(""), ParsedPosition::Unplaced);
        assert_eq!(parse_position("T"), ParsedPosition::Unplaced);
        assert_eq!(parse_position("-5"), ParsedPosition::Unplaced);
    }

    #[test]
    fn finish_detection() {
        let done = Some(Thru::Finished);
        assert!(event_finished(&snapshot("x", 5, vec![])));
        assert!(!event_finished(&snapshot("x", 4, vec![])));
        assert!(event_finished(&snapshot(
            "x",
            4,
            vec![
                row("1", "1", -10, done),
                row("2", "T2", -8, Some(Thru::Holes(18))),
                row("3", "CUT", 5, None),
            ]
        )));
        assert!(!event_finished(&snapshot(
            "x",
            4,
            vec![row("1", "1", -10, done), row("2", "T2", -8, Some(Thru::Holes(16)))]
        )));
        assert!(!event_finished(&snapshot("x", 3, vec![row("1", "1", -10, done)])));
    }

    #[test]
    fn unmapped_rows_are_skipped() {
        let golfers = HashMap::from([("1".to_string(), 11), ("3".to_string(), 13)]);
        let rows = map_live_rows(
            &snapshot(
                "x",
                2,
                vec![
                    row("1", "T3", -4, Some(Thru::Holes(9))),
                    row("2", "1", -6, Some(Thru::Holes(10))),
                    row("3", "WD", 3, None),
                    row("1", "T3", -4, Some(Thru::Holes(9))),
                ],
            ),
            &golfers,
            7,
            Utc::now(),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].golfer_id, Set(11));
        assert_eq!(rows[0].position, Set(Some(3)));
        assert_eq!(rows[0].status, Set(ResultStatus::Active));
        assert_eq!(rows[1].status, Set(ResultStatus::Withdrawn));
        assert_eq!(rows[1].position, Set(None));
    }

    #[tokio::test]
    async fn sync_is_idempotent_and_guarded() {
        let league = test_league().await;
        let ctx = &league.ctx;
        let masters = insert_tournament(&ctx.db, "Masters Tournament", TournamentStatus::Active).await;
        let other = insert_tournament(&ctx.db, "RBC Heritage", TournamentStatus::Upcoming).await;
        insert_golfer(&ctx.db, "1", "Scheffler, Scottie", Some(3.0)).await;
        insert_golfer(&ctx.db, "2", "McIlroy, Rory", Some(2.5)).await;

        league.feed.set_live(snapshot(
            "The Masters Tournament",
            2,
            vec![
                row("1", "1", -8, Some(Thru::Holes(12))),
                row("2", "CUT", 4, None),
                row("99", "T2", -6, Some(Thru::Holes(11))),
            ],
        ));
        let first = sync_results(ctx, masters.id).await.unwrap();
        let before = query::results(&ctx.db, masters.id).await.unwrap();
        let second = sync_results(ctx, masters.id).await.unwrap();
        let after = query::results(&ctx.db, masters.id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.rows, 2);
        let strip = |rows: Vec<tournament_result::Model>| {
            rows.into_iter()
                .map(|r| (r.golfer_id, r.position, r.score_to_par, r.status, r.thru))
                .collect::<Vec<_>>()
        };
        assert_eq!(strip(before), strip(after));

        let err = sync_results(ctx, other.id).await.unwrap_err();
        assert!(matches!(err, GenericError::TournamentMismatch(_)));
        assert!(query::results(&ctx.db, other.id).await.unwrap().is_empty());

        let synced = query::tournament(&ctx.db, masters.id).await.unwrap();
        assert_eq!(synced.last_synced_at, Some(league.clock.now()));
    }
}
