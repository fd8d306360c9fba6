use std::collections::HashMap;

use chrono::{DateTime, Utc};
use entity::prelude::*;
use entity::*;
use itertools::Itertools;
use log::info;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::Set;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait};

use crate::context::AppContext;
use crate::db::BATCH_SIZE;
use crate::error::GenericError;
use crate::feed::{FeedPlayer, Ranking};

fn golfer_rows(
    players: &[FeedPlayer],
    rankings: &[Ranking],
    now: DateTime<Utc>,
) -> Vec<golfer::ActiveModel> {
    let skill_by_id: HashMap<&str, f64> = rankings
        .iter()
        .filter_map(|r| Some((r.player_id.as_str(), r.skill_estimate?)))
        .collect();
    players
        .iter()
        .unique_by(|p| p.player_id.as_str())
        .map(|p| golfer::ActiveModel {
            external_id: Set(Some(p.player_id.clone())),
            name: Set(p.player_name.clone()),
            country: Set(p.country.clone().filter(|c| !c.is_empty())),
            skill_estimate: Set(skill_by_id.get(p.player_id.as_str()).copied()),
            updated_at: Set(now),
            ..Default::default()
        })
        .collect()
}

pub(crate) async fn upsert_golfers(
    db: &impl ConnectionTrait,
    rows: Vec<golfer::ActiveModel>,
) -> Result<(), DbErr> {
    for chunk in rows.chunks(BATCH_SIZE) {
        Golfer::insert_many(chunk.iter().cloned())
            .on_conflict(
                OnConflict::column(golfer::Column::ExternalId)
                    .update_columns([
                        golfer::Column::Name,
                        golfer::Column::Country,
                        golfer::Column::SkillEstimate,
                        golfer::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }
    Ok(())
}

/// Pulls the full roster and skill rankings and upserts every golfer by
/// external id. Golfers are never deleted.
pub async fn sync_golfers(ctx: &AppContext) -> Result<usize, GenericError> {
    let players = ctx.feed.player_list().await?;
    let rankings = ctx.feed.rankings().await?;
    let rows = golfer_rows(&players, &rankings, ctx.now());
    let count = rows.len();
    upsert_golfers(&ctx.db, rows).await?;
    info!("Synced {} golfers ({} with a skill estimate)", count, rankings.len());
    Ok(count)
}
