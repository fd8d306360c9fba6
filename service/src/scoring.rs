//! Best-two-of-four scoring and tie-broken ranking of entries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use entity::prelude::*;
use entity::sea_orm_active_enums::TournamentStatus;
use entity::*;
use itertools::Itertools;
use log::info;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::Set;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait};

use crate::context::AppContext;
use crate::db::BATCH_SIZE;
use crate::error::GenericError;
use crate::query;

/// One entry's picks, tier 1 first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPicks {
    pub user_id: i32,
    pub entry_number: i32,
    pub picks: [Option<i32>; 4],
}

impl From<&entry::Model> for EntryPicks {
    fn from(e: &entry::Model) -> Self {
        Self {
            user_id: e.user_id,
            entry_number: e.entry_number,
            picks: e.picks(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredEntry {
    pub user_id: i32,
    pub entry_number: i32,
    pub tier_scores: [Option<i32>; 4],
    /// `None` when fewer than two picks returned a usable score.
    pub best_two_total: Option<i32>,
    pub third_best: Option<i32>,
    pub fourth_best: Option<i32>,
    pub rank: i32,
}

type SortKey = (bool, i32, bool, i32, bool, i32);

impl ScoredEntry {
    fn new(user_id: i32, entry_number: i32, tier_scores: [Option<i32>; 4]) -> Self {
        let sorted = tier_scores.iter().flatten().copied().sorted().collect_vec();
        let best_two_total = (sorted.len() >= 2).then(|| sorted[0] + sorted[1]);
        Self {
            user_id,
            entry_number,
            tier_scores,
            best_two_total,
            third_best: sorted.get(2).copied(),
            fourth_best: sorted.get(3).copied(),
            rank: 0,
        }
    }

    pub fn is_disqualified(&self) -> bool {
        self.best_two_total.is_none()
    }

    /// Lower sorts first. Entries with equal keys share a rank.
    fn sort_key(&self) -> SortKey {
        (
            self.is_disqualified(),
            self.best_two_total.unwrap_or(0),
            self.third_best.is_none(),
            self.third_best.unwrap_or(0),
            self.fourth_best.is_none(),
            self.fourth_best.unwrap_or(0),
        )
    }
}

/// Score a pick counts for: only golfers still in (or done with) the event
/// who have a number on the board.
pub fn pick_score(
    golfer_id: Option<i32>,
    results: &HashMap<i32, tournament_result::Model>,
) -> Option<i32> {
    let result = results.get(&golfer_id?)?;
    if result.status.is_scoring() {
        result.score_to_par
    } else {
        None
    }
}

/// Scores and ranks every entry. Ties on the full tiebreak key share a rank,
/// and the next distinct entry takes its 1-based position in the sorted list.
pub fn rank_entries(
    entries: &[EntryPicks],
    results: &HashMap<i32, tournament_result::Model>,
) -> Vec<ScoredEntry> {
    let mut scored = entries
        .iter()
        .map(|e| {
            ScoredEntry::new(
                e.user_id,
                e.entry_number,
                e.picks.map(|pick| pick_score(pick, results)),
            )
        })
        .sorted_by_key(|s| (s.sort_key(), s.user_id, s.entry_number))
        .collect_vec();

    let mut previous: Option<SortKey> = None;
    let mut rank = 0;
    for (index, entry) in scored.iter_mut().enumerate() {
        let key = entry.sort_key();
        if previous != Some(key) {
            rank = index as i32 + 1;
            previous = Some(key);
        }
        entry.rank = rank;
    }
    scored
}

/// Upserts one standing row per entry identity, overwriting every derived field.
pub async fn write_standings(
    db: &impl ConnectionTrait,
    tournament_id: i32,
    scored: &[ScoredEntry],
    now: DateTime<Utc>,
) -> Result<(), DbErr> {
    for chunk in scored.chunks(BATCH_SIZE) {
        Standing::insert_many(chunk.iter().map(|s| standing::ActiveModel {
            tournament_id: Set(tournament_id),
            user_id: Set(s.user_id),
            entry_number: Set(s.entry_number),
            tier1_score: Set(s.tier_scores[0]),
            tier2_score: Set(s.tier_scores[1]),
            tier3_score: Set(s.tier_scores[2]),
            tier4_score: Set(s.tier_scores[3]),
            best_two_total: Set(s.best_two_total),
            third_best_score: Set(s.third_best),
            has_third_score: Set(s.third_best.is_some()),
            fourth_best_score: Set(s.fourth_best),
            has_fourth_score: Set(s.fourth_best.is_some()),
            rank: Set(s.rank),
            updated_at: Set(now),
            ..Default::default()
        }))
        .on_conflict(
            OnConflict::columns([
                standing::Column::TournamentId,
                standing::Column::UserId,
                standing::Column::EntryNumber,
            ])
            .update_columns([
                standing::Column::Tier1Score,
                standing::Column::Tier2Score,
                standing::Column::Tier3Score,
                standing::Column::Tier4Score,
                standing::Column::BestTwoTotal,
                standing::Column::ThirdBestScore,
                standing::Column::HasThirdScore,
                standing::Column::FourthBestScore,
                standing::Column::HasFourthScore,
                standing::Column::Rank,
                standing::Column::UpdatedAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    }
    Ok(())
}

/// Recomputes the standings of one tournament from its stored results and entries.
pub async fn calculate_standings(
    ctx: &AppContext,
    tournament_id: i32,
) -> Result<Vec<ScoredEntry>, GenericError> {
    let results = query::results(&ctx.db, tournament_id)
        .await?
        .into_iter()
        .map(|r| (r.golfer_id, r))
        .collect::<HashMap<_, _>>();
    let entries = query::entries(&ctx.db, tournament_id)
        .await?
        .iter()
        .map(EntryPicks::from)
        .collect_vec();

    let scored = rank_entries(&entries, &results);
    if scored.is_empty() {
        return Ok(scored);
    }

    let now = ctx.now();
    let rows = scored.clone();
    ctx.db
        .transaction(move |txn| {
            let rows = rows.clone();
            Box::pin(async move { write_standings(txn, tournament_id, &rows, now).await })
        })
        .await?;
    info!(
        "Calculated standings for tournament {}: {} entries",
        tournament_id,
        scored.len()
    );
    Ok(scored)
}

/// Recomputes every active and completed tournament. Returns how many
/// tournaments were scored.
pub async fn recalculate_all(ctx: &AppContext) -> Result<usize, GenericError> {
    let mut count = 0;
    for status in [TournamentStatus::Active, TournamentStatus::Completed] {
        for tournament in query::tournaments_with_status(&ctx.db, status).await? {
            calculate_standings(ctx, tournament.id).await?;
            count += 1;
        }
    }
    info!("Recalculated standings for {} tournaments", count);
    Ok(count)
}
