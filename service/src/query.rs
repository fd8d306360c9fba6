use std::collections::HashMap;

use chrono::Datelike;
use entity::prelude::*;
use entity::sea_orm_active_enums::{ResultStatus, TournamentStatus};
use entity::*;
use itertools::Itertools;
use serde::Serialize;
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;
use sea_orm::entity::prelude::*;
use sea_orm::QueryOrder;

use crate::error::GenericError;
use crate::purse;

pub async fn tournament(
    db: &impl ConnectionTrait,
    tournament_id: i32,
) -> Result<tournament::Model, GenericError> {
    Tournament::find_by_id(tournament_id)
        .one(db)
        .await?
        .ok_or(GenericError::NotFound("Tournament not found"))
}

pub async fn tournaments_with_status(
    db: &impl ConnectionTrait,
    status: TournamentStatus,
) -> Result<Vec<tournament::Model>, GenericError> {
    Ok(Tournament::find()
        .filter(tournament::Column::Status.eq(status))
        .order_by_asc(tournament::Column::StartDate)
        .all(db)
        .await?)
}

pub async fn results(
    db: &impl ConnectionTrait,
    tournament_id: i32,
) -> Result<Vec<tournament_result::Model>, GenericError> {
    Ok(TournamentResult::find()
        .filter(tournament_result::Column::TournamentId.eq(tournament_id))
        .order_by_asc(tournament_result::Column::GolferId)
        .all(db)
        .await?)
}

pub async fn field(
    db: &impl ConnectionTrait,
    tournament_id: i32,
) -> Result<Vec<tournament_field::Model>, GenericError> {
    Ok(TournamentField::find()
        .filter(tournament_field::Column::TournamentId.eq(tournament_id))
        .order_by_asc(tournament_field::Column::Tier)
        .order_by_asc(tournament_field::Column::GolferId)
        .all(db)
        .await?)
}

pub async fn entries(
    db: &impl ConnectionTrait,
    tournament_id: i32,
) -> Result<Vec<entry::Model>, GenericError> {
    Ok(Entry::find()
        .filter(entry::Column::TournamentId.eq(tournament_id))
        .order_by_asc(entry::Column::UserId)
        .order_by_asc(entry::Column::EntryNumber)
        .all(db)
        .await?)
}

pub async fn golfer_names(
    db: &impl ConnectionTrait,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, String>, GenericError> {
    let ids = ids.into_iter().collect::<Vec<_>>();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(Golfer::find()
        .filter(golfer::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|g| (g.id, g.name))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct StandingRow {
    pub rank: i32,
    pub user_id: i32,
    pub display_name: String,
    pub entry_number: i32,
    pub tier_scores: [Option<i32>; 4],
    pub best_two_total: Option<i32>,
    pub third_best_score: Option<i32>,
    pub fourth_best_score: Option<i32>,
}

/// Stored standings of a tournament, best rank first, with user names resolved.
pub async fn standings_view(
    db: &impl ConnectionTrait,
    tournament_id: i32,
) -> Result<Vec<StandingRow>, GenericError> {
    let rows = Standing::find()
        .filter(standing::Column::TournamentId.eq(tournament_id))
        .find_also_related(User)
        .order_by_asc(standing::Column::Rank)
        .order_by_asc(standing::Column::UserId)
        .order_by_asc(standing::Column::EntryNumber)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(s, user)| StandingRow {
            rank: s.rank,
            user_id: s.user_id,
            display_name: user
                .map(|u| u.shown_name().to_string())
                .unwrap_or_else(|| format!("User {}", s.user_id)),
            entry_number: s.entry_number,
            tier_scores: [s.tier1_score, s.tier2_score, s.tier3_score, s.tier4_score],
            best_two_total: s.best_two_total,
            third_best_score: s.third_best_score,
            fourth_best_score: s.fourth_best_score,
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct GolferResultRow {
    pub golfer_id: i32,
    pub name: String,
    /// "T5" style display position, or the golfer's status when unplaced.
    pub position: String,
    pub score: String,
    pub thru: Option<i32>,
}

/// The tournament's own leaderboard: placed golfers by position, then the rest.
pub async fn tournament_leaderboard(
    db: &impl ConnectionTrait,
    tournament_id: i32,
) -> Result<Vec<GolferResultRow>, GenericError> {
    let results = results(db, tournament_id).await?;
    let names = golfer_names(db, results.iter().map(|r| r.golfer_id)).await?;
    let mut shared = HashMap::new();
    for position in results.iter().filter_map(|r| r.position) {
        *shared.entry(position).or_insert(0) += 1;
    }
    let mut rows = results;
    rows.sort_by_key(|r| (r.position.is_none(), r.position.unwrap_or(i32::MAX), r.golfer_id));
    Ok(rows
        .into_iter()
        .map(|r| GolferResultRow {
            golfer_id: r.golfer_id,
            name: names
                .get(&r.golfer_id)
                .cloned()
                .unwrap_or_else(|| format!("Golfer {}", r.golfer_id)),
            position: match (r.position, r.status) {
                (Some(p), _) if shared.get(&p).copied().unwrap_or(0) > 1 => format!("T{p}"),
                (Some(p), _) => p.to_string(),
                (None, ResultStatus::Cut) => "MC".to_string(),
                (None, ResultStatus::Active | ResultStatus::Finished) => "-".to_string(),
                (None, status) => status.as_str().to_uppercase(),
            },
            score: match (r.status, r.score_to_par) {
                (ResultStatus::Cut, _) => "MC".to_string(),
                (_, None) => "-".to_string(),
                (_, score) => crate::notify::format_score(score),
            },
            thru: r.thru,
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct TournamentRow {
    pub id: i32,
    pub name: String,
    /// ISO dates.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: String,
    pub picks_locked: bool,
    pub entry_price: Option<i32>,
    pub three_entry_price: Option<i32>,
}

impl From<tournament::Model> for TournamentRow {
    fn from(t: tournament::Model) -> Self {
        Self {
            id: t.id,
            name: t.name,
            start_date: t.start_date.map(|d| d.to_string()),
            end_date: t.end_date.map(|d| d.to_string()),
            status: t.status.as_str().to_string(),
            picks_locked: t.picks_locked,
            entry_price: t.entry_price,
            three_entry_price: t.three_entry_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct TournamentOverview {
    pub active: Vec<TournamentRow>,
    pub upcoming: Vec<TournamentRow>,
    pub completed: Vec<TournamentRow>,
}

pub async fn tournament_overview(
    db: &impl ConnectionTrait,
) -> Result<TournamentOverview, GenericError> {
    let rows = |list: Vec<tournament::Model>| list.into_iter().map(TournamentRow::from).collect();
    let mut completed: Vec<TournamentRow> =
        rows(tournaments_with_status(db, TournamentStatus::Completed).await?);
    completed.reverse();
    Ok(TournamentOverview {
        active: rows(tournaments_with_status(db, TournamentStatus::Active).await?),
        upcoming: rows(tournaments_with_status(db, TournamentStatus::Upcoming).await?),
        completed,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct FieldRow {
    pub field_id: i32,
    pub golfer_id: i32,
    pub name: String,
    pub tier: i32,
    pub skill_estimate: Option<f64>,
}

/// The tournament field, tier 1 first and strongest golfers first within a tier.
pub async fn field_view(
    db: &impl ConnectionTrait,
    tournament_id: i32,
) -> Result<Vec<FieldRow>, GenericError> {
    let mut rows = TournamentField::find()
        .filter(tournament_field::Column::TournamentId.eq(tournament_id))
        .find_also_related(Golfer)
        .all(db)
        .await?
        .into_iter()
        .map(|(f, golfer)| FieldRow {
            field_id: f.id,
            golfer_id: f.golfer_id,
            name: golfer
                .as_ref()
                .map(|g| g.name.clone())
                .unwrap_or_else(|| format!("Golfer {}", f.golfer_id)),
            tier: f.tier,
            skill_estimate: golfer.and_then(|g| g.skill_estimate),
        })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| {
        a.tier
            .cmp(&b.tier)
            .then_with(|| {
                b.skill_estimate
                    .unwrap_or(f64::MIN)
                    .total_cmp(&a.skill_estimate.unwrap_or(f64::MIN))
            })
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(rows)
}

/// Years with at least one completed tournament, newest first.
pub async fn season_years(db: &impl ConnectionTrait) -> Result<Vec<i32>, GenericError> {
    Ok(tournaments_with_status(db, TournamentStatus::Completed)
        .await?
        .iter()
        .filter_map(|t| t.start_date.map(|d| d.year()))
        .sorted_by(|a, b| b.cmp(a))
        .dedup()
        .collect())
}

/// Completed tournaments that started in `year`, or all of them.
pub async fn season_tournaments(
    db: &impl ConnectionTrait,
    year: Option<i32>,
) -> Result<Vec<tournament::Model>, GenericError> {
    Ok(tournaments_with_status(db, TournamentStatus::Completed)
        .await?
        .into_iter()
        .filter(|t| year.map_or(true, |y| t.start_date.is_some_and(|d| d.year() == y)))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct SeasonRow {
    pub rank: i32,
    pub user_id: i32,
    pub display_name: String,
    pub tournaments_played: usize,
    pub entries: usize,
    /// Sum of best-two totals, a disqualified entry adds nothing.
    pub total_score: i64,
    pub wins: usize,
    pub top3_finishes: usize,
    pub top5_finishes: usize,
    pub top10_finishes: usize,
    pub average_position: Option<f64>,
    pub best_finish: Option<i32>,
    /// Full purse of every tournament one of the user's entries won.
    pub winnings: i64,
}

/// Season totals per user over completed tournaments, most winnings first and
/// then best average finish. Users level on both share a rank.
pub async fn season_standings(
    db: &impl ConnectionTrait,
    year: Option<i32>,
) -> Result<Vec<SeasonRow>, GenericError> {
    let tournaments = season_tournaments(db, year).await?;
    if tournaments.is_empty() {
        return Ok(Vec::new());
    }
    let ids = tournaments.iter().map(|t| t.id).collect_vec();
    let entries = Entry::find()
        .filter(entry::Column::TournamentId.is_in(ids.clone()))
        .all(db)
        .await?;
    let standings = Standing::find()
        .filter(standing::Column::TournamentId.is_in(ids))
        .all(db)
        .await?;

    let purses: HashMap<i32, i64> = tournaments
        .iter()
        .map(|t| {
            let counts = entries
                .iter()
                .filter(|e| e.tournament_id == t.id)
                .counts_by(|e| e.user_id);
            let purse =
                purse::compute_purse(t.entry_price, t.three_entry_price, counts.into_values());
            (t.id, purse.unwrap_or(0))
        })
        .collect();
    let played = entries
        .iter()
        .map(|e| (e.user_id, e.tournament_id))
        .unique()
        .counts_by(|(user_id, _)| user_id);
    let by_user = standings.iter().into_group_map_by(|s| s.user_id);
    let names: HashMap<i32, String> = User::find()
        .filter(user::Column::Id.is_in(played.keys().copied().collect_vec()))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.shown_name().to_string()))
        .collect();

    let mut rows = played
        .into_iter()
        .map(|(user_id, tournaments_played)| {
            let own = by_user.get(&user_id).map(Vec::as_slice).unwrap_or_default();
            let within = |cutoff: i32| own.iter().filter(|s| s.rank <= cutoff).count();
            SeasonRow {
                rank: 0,
                user_id,
                display_name: names
                    .get(&user_id)
                    .cloned()
                    .unwrap_or_else(|| format!("User {user_id}")),
                tournaments_played,
                entries: own.len(),
                total_score: own.iter().filter_map(|s| s.best_two_total).map(i64::from).sum(),
                wins: within(1),
                top3_finishes: within(3),
                top5_finishes: within(5),
                top10_finishes: within(10),
                average_position: (!own.is_empty()).then(|| {
                    own.iter().map(|s| f64::from(s.rank)).sum::<f64>() / own.len() as f64
                }),
                best_finish: own.iter().map(|s| s.rank).min(),
                winnings: own
                    .iter()
                    .filter(|s| s.rank == 1)
                    .map(|s| s.tournament_id)
                    .unique()
                    .map(|t| purses.get(&t).copied().unwrap_or(0))
                    .sum(),
            }
        })
        .collect_vec();

    rows.sort_by(|a, b| {
        b.winnings
            .cmp(&a.winnings)
            .then_with(|| {
                a.average_position
                    .unwrap_or(f64::MAX)
                    .total_cmp(&b.average_position.unwrap_or(f64::MAX))
            })
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
    let mut previous: Option<(i64, Option<f64>, i32)> = None;
    for (index, row) in rows.iter_mut().enumerate() {
        row.rank = match previous {
            Some((winnings, average, rank))
                if winnings == row.winnings && average == row.average_position =>
            {
                rank
            }
            _ => index as i32 + 1,
        };
        previous = Some((row.winnings, row.average_position, row.rank));
    }
    Ok(rows)
}
