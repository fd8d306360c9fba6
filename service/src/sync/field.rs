use std::collections::{HashMap, HashSet};

use entity::prelude::*;
use entity::*;
use itertools::Itertools;
use log::{info, warn};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::Set;

use crate::context::AppContext;
use crate::db::BATCH_SIZE;
use crate::error::GenericError;
use crate::{query, reconcile};

/// Field positions (0-based, strongest first) at which tiers 2, 3 and 4 begin.
const TIER_CUTOFFS: [usize; 3] = [6, 24, 60];

pub fn tier_for_rank(index: usize) -> i32 {
    TIER_CUTOFFS
        .iter()
        .position(|cutoff| index < *cutoff)
        .map_or(4, |tier| tier as i32 + 1)
}

/// Orders golfers by skill estimate, highest first with unrated golfers last,
/// and assigns tiers by position.
pub fn assign_tiers(golfers: &[(i32, Option<f64>)]) -> Vec<(i32, i32)> {
    golfers
        .iter()
        .sorted_by(|(_, a), (_, b)| match (a, b) {
            (Some(a), Some(b)) => b.total_cmp(a),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        })
        .enumerate()
        .map(|(index, (golfer_id, _))| (*golfer_id, tier_for_rank(index)))
        .collect()
}

/// Rebuilds a tournament's tiers from the feed's current field. Golfers the
/// roster does not know yet are created first.
pub async fn auto_assign_field(ctx: &AppContext, tournament_id: i32) -> Result<usize, GenericError> {
    let tournament = query::tournament(&ctx.db, tournament_id).await?;
    let snapshot = ctx.feed.field(&ctx.settings.tour).await?;
    if !reconcile::matches_any(tournament.known_names(), &snapshot.event_name) {
        warn!(
            "Field assignment for '{}' aborted, feed reports '{}'",
            tournament.name, snapshot.event_name
        );
        return Err(GenericError::mismatch(&snapshot.event_name, &tournament.name));
    }

    let now = ctx.now();
    let external_ids = snapshot
        .field
        .iter()
        .map(|p| p.player_id.clone())
        .unique()
        .collect_vec();
    if external_ids.is_empty() {
        return Err(GenericError::BadRequest("The feed returned an empty field"));
    }

    let missing = snapshot
        .field
        .iter()
        .unique_by(|p| p.player_id.as_str())
        .map(|p| golfer::ActiveModel {
            external_id: Set(Some(p.player_id.clone())),
            name: Set(p.player_name.clone()),
            country: Set(p.country.clone()),
            skill_estimate: Set(None),
            updated_at: Set(now),
            ..Default::default()
        })
        .collect_vec();
    for chunk in missing.chunks(BATCH_SIZE) {
        Golfer::insert_many(chunk.iter().cloned())
            .on_conflict(
                OnConflict::column(golfer::Column::ExternalId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&ctx.db)
            .await?;
    }

    let golfers: HashMap<String, (i32, Option<f64>)> = Golfer::find()
        .filter(golfer::Column::ExternalId.is_in(external_ids.clone()))
        .all(&ctx.db)
        .await?
        .into_iter()
        .filter_map(|g| Some((g.external_id?, (g.id, g.skill_estimate))))
        .collect();
    let mut placed = HashSet::new();
    let matched = external_ids
        .iter()
        .filter_map(|id| golfers.get(id).copied())
        .filter(|(golfer_id, _)| placed.insert(*golfer_id))
        .collect_vec();
    if matched.is_empty() {
        return Err(GenericError::BadRequest("No golfers in the feed's field could be matched"));
    }

    let rows = assign_tiers(&matched)
        .into_iter()
        .map(|(golfer_id, tier)| tournament_field::ActiveModel {
            tournament_id: Set(tournament_id),
            golfer_id: Set(golfer_id),
            tier: Set(tier),
            created_at: Set(now),
            ..Default::default()
        })
        .collect_vec();
    let count = rows.len();
    ctx.db
        .transaction(move |txn| {
            let rows = rows.clone();
            Box::pin(async move {
                TournamentField::delete_many()
                    .filter(tournament_field::Column::TournamentId.eq(tournament_id))
                    .exec(txn)
                    .await?;
                for chunk in rows.chunks(BATCH_SIZE) {
                    TournamentField::insert_many(chunk.iter().cloned())
                        .exec_without_returning(txn)
                        .await?;
                }
                Ok(())
            })
        })
        .await?;
    info!("Assigned {} golfers to tiers for '{}'", count, tournament.name);
    Ok(count)
}

/// Moves one golfer of a tournament's field to another tier.
pub async fn move_tier(
    ctx: &AppContext,
    field_id: i32,
    tier: i32,
) -> Result<tournament_field::Model, GenericError> {
    if !(1..=4).contains(&tier) {
        return Err(GenericError::BadRequest("Tier must be between 1 and 4"));
    }
    let row = TournamentField::find_by_id(field_id)
        .one(&ctx.db)
        .await?
        .ok_or(GenericError::NotFound("Field entry not found"))?;
    let mut row: tournament_field::ActiveModel = row.into();
    row.tier = Set(tier);
    Ok(row.update(&ctx.db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedPlayer, FieldSnapshot};
    use crate::testing::{insert_golfer, insert_tournament, test_league};
    use entity::sea_orm_active_enums::TournamentStatus;

    #[test]
    fn tier_cutoffs() {
        assert_eq!(tier_for_rank(0), 1);
        assert_eq!(tier_for_rank(5), 1);
        assert_eq!(tier_for_rank(6), 2);
        assert_eq!(tier_for_rank(23), 2);
        assert_eq!(tier_for_rank(24), 3);
        assert_eq!(tier_for_rank(59), 3);
        assert_eq!(tier_for_rank(60), 4);
        assert_eq!(tier_for_rank(150), 4);
    }

    #[test]
    fn unrated_golfers_go_last() {
        let mut golfers = (1..=6).map(|id| (id, Some(id as f64))).collect_vec();
        golfers.push((100, None));
        golfers.push((7, Some(0.5)));
        let tiers = assign_tiers(&golfers);
        assert_eq!(tiers[0], (6, 1));
        assert_eq!(tiers[5], (1, 1));
        assert_eq!(tiers[6], (7, 2));
        assert_eq!(tiers[7], (100, 2));
    }

    fn field_player(id: &str) -> FeedPlayer {
        FeedPlayer {
            player_id: id.to_string(),
            player_name: format!("Player {id}"),
            country: None,
        }
    }

    #[tokio::test]
    async fn replaces_field_and_creates_missing_golfers() {
        let league = test_league().await;
        let ctx = &league.ctx;
        let t = insert_tournament(&ctx.db, "RBC Heritage", TournamentStatus::Active).await;
        for i in 1..=8 {
            insert_golfer(&ctx.db, &i.to_string(), &format!("Player {i}"), Some(i as f64)).await;
        }
        league.feed.set_field(FieldSnapshot {
            event_name: "RBC Heritage".to_string(),
            current_round: Some(0),
            field: (1..=9).map(|i| field_player(&i.to_string())).collect(),
        });

        assert_eq!(auto_assign_field(ctx, t.id).await.unwrap(), 9);
        assert_eq!(auto_assign_field(ctx, t.id).await.unwrap(), 9);
        let field = query::field(&ctx.db, t.id).await.unwrap();
        assert_eq!(field.len(), 9);
        assert_eq!(field.iter().filter(|f| f.tier == 1).count(), 6);
        assert_eq!(Golfer::find().all(&ctx.db).await.unwrap().len(), 9);

        let moved = move_tier(ctx, field[0].id, 4).await.unwrap();
        assert_eq!(moved.tier, 4);
        assert!(matches!(
            move_tier(ctx, field[0].id, 5).await,
            Err(GenericError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn mismatched_field_is_not_written() {
        let league = test_league().await;
        let ctx = &league.ctx;
        let t = insert_tournament(&ctx.db, "Masters Tournament", TournamentStatus::Active).await;
        league.feed.set_field(FieldSnapshot {
            event_name: "Valero Texas Open".to_string(),
            current_round: Some(0),
            field: vec![field_player("1")],
        });
        assert!(matches!(
            auto_assign_field(ctx, t.id).await,
            Err(GenericError::TournamentMismatch(_))
        ));
        assert!(query::field(&ctx.db, t.id).await.unwrap().is_empty());
        assert!(Golfer::find().all(&ctx.db).await.unwrap().is_empty());
    }
}
