//! Users' tier picks for a tournament.

use std::collections::HashMap;

use entity::prelude::*;
use entity::sea_orm_active_enums::TournamentStatus;
use entity::*;
use log::info;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use sea_orm::{QueryOrder, QuerySelect};

use crate::context::AppContext;
use crate::error::GenericError;
use crate::notify::{self, PickAction};
use crate::{purse, query};

pub async fn create_user(
    db: &impl ConnectionTrait,
    username: &str,
    display_name: Option<String>,
    is_admin: bool,
) -> Result<user::Model, GenericError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(GenericError::BadRequest("Username must not be empty"));
    }
    let taken = User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(GenericError::Conflict("Username is already taken"));
    }
    Ok(user::ActiveModel {
        username: Set(username.to_string()),
        display_name: Set(display_name.filter(|n| !n.trim().is_empty())),
        is_admin: Set(is_admin),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Lowest entry number the user has not used yet for this tournament.
pub async fn next_entry_number(
    db: &impl ConnectionTrait,
    user_id: i32,
    tournament_id: i32,
) -> Result<i32, GenericError> {
    let highest: Option<i32> = Entry::find()
        .select_only()
        .column(entry::Column::EntryNumber)
        .filter(entry::Column::UserId.eq(user_id))
        .filter(entry::Column::TournamentId.eq(tournament_id))
        .order_by_desc(entry::Column::EntryNumber)
        .into_tuple()
        .one(db)
        .await?;
    Ok(highest.map_or(1, |n| n + 1))
}

/// Every pick must be a golfer of the tournament's field in the tier it is
/// picked for. Without a field only the golfer's existence is checked.
async fn validate_picks(
    db: &impl ConnectionTrait,
    tournament_id: i32,
    picks: &[Option<i32>; 4],
) -> Result<(), GenericError> {
    let field: HashMap<i32, i32> = query::field(db, tournament_id)
        .await?
        .into_iter()
        .map(|f| (f.golfer_id, f.tier))
        .collect();
    let chosen = picks.iter().flatten().copied().collect::<Vec<_>>();
    if field.is_empty() {
        let known = query::golfer_names(db, chosen.iter().copied()).await?;
        if chosen.iter().any(|id| !known.contains_key(id)) {
            return Err(GenericError::BadRequest("Unknown golfer picked"));
        }
        return Ok(());
    }
    for (index, pick) in picks.iter().enumerate() {
        if let Some(golfer_id) = pick {
            if field.get(golfer_id) != Some(&(index as i32 + 1)) {
                return Err(GenericError::BadRequest(
                    "Golfer is not in that tier of the field",
                ));
            }
        }
    }
    Ok(())
}

/// Creates or replaces the picks of one entry while the tournament is open,
/// then tells the group about it.
pub async fn save_entry(
    ctx: &AppContext,
    user_id: i32,
    tournament_id: i32,
    entry_number: i32,
    picks: [Option<i32>; 4],
) -> Result<entry::Model, GenericError> {
    if entry_number < 1 {
        return Err(GenericError::BadRequest("Entry number must be at least 1"));
    }
    let user = User::find_by_id(user_id)
        .one(&ctx.db)
        .await?
        .ok_or(GenericError::NotFound("User not found"))?;
    let tournament = query::tournament(&ctx.db, tournament_id).await?;
    if tournament.picks_locked {
        return Err(GenericError::Forbidden("Picks are locked for this tournament"));
    }
    if tournament.status != TournamentStatus::Active {
        return Err(GenericError::Conflict(
            "Picks are only open for the active tournament",
        ));
    }
    validate_picks(&ctx.db, tournament_id, &picks).await?;

    let now = ctx.now();
    let existing = Entry::find()
        .filter(entry::Column::UserId.eq(user_id))
        .filter(entry::Column::TournamentId.eq(tournament_id))
        .filter(entry::Column::EntryNumber.eq(entry_number))
        .one(&ctx.db)
        .await?;
    let (saved, action) = match existing {
        Some(existing) => {
            let mut model: entry::ActiveModel = existing.into();
            model.tier1_golfer_id = Set(picks[0]);
            model.tier2_golfer_id = Set(picks[1]);
            model.tier3_golfer_id = Set(picks[2]);
            model.tier4_golfer_id = Set(picks[3]);
            model.updated_at = Set(now);
            (model.update(&ctx.db).await?, PickAction::Updated)
        }
        None => {
            let model = entry::ActiveModel {
                user_id: Set(user_id),
                tournament_id: Set(tournament_id),
                entry_number: Set(entry_number),
                tier1_golfer_id: Set(picks[0]),
                tier2_golfer_id: Set(picks[1]),
                tier3_golfer_id: Set(picks[2]),
                tier4_golfer_id: Set(picks[3]),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            (model.insert(&ctx.db).await?, PickAction::Created)
        }
    };
    info!(
        "{} entry {} of {} for '{}'",
        if action == PickAction::Created { "Created" } else { "Updated" },
        entry_number,
        user.username,
        tournament.name
    );

    let names = query::golfer_names(&ctx.db, picks.iter().flatten().copied()).await?;
    let golfers = picks.map(|pick| pick.and_then(|id| names.get(&id).cloned()));
    let purse = purse::tournament_purse(&ctx.db, &tournament).await?;
    let text = notify::pick_message(
        user.shown_name(),
        action,
        entry_number,
        &tournament.name,
        &golfers,
        purse,
    );
    notify::broadcast(ctx.notifier.as_ref(), &text).await;
    Ok(saved)
}

/// Deletes one entry and its standing. Users may only do so before picks lock,
/// administrators at any time.
pub async fn delete_entry(
    ctx: &AppContext,
    user_id: i32,
    tournament_id: i32,
    entry_number: i32,
    as_admin: bool,
) -> Result<(), GenericError> {
    let tournament = query::tournament(&ctx.db, tournament_id).await?;
    if tournament.picks_locked && !as_admin {
        return Err(GenericError::Forbidden("Picks are locked for this tournament"));
    }
    let deleted = ctx
        .db
        .transaction(move |txn| {
            Box::pin(async move {
                Standing::delete_many()
                    .filter(standing::Column::TournamentId.eq(tournament_id))
                    .filter(standing::Column::UserId.eq(user_id))
                    .filter(standing::Column::EntryNumber.eq(entry_number))
                    .exec(txn)
                    .await?;
                let res = Entry::delete_many()
                    .filter(entry::Column::TournamentId.eq(tournament_id))
                    .filter(entry::Column::UserId.eq(user_id))
                    .filter(entry::Column::EntryNumber.eq(entry_number))
                    .exec(txn)
                    .await?;
                Ok(res.rows_affected)
            })
        })
        .await?;
    if deleted == 0 {
        return Err(GenericError::NotFound("Entry not found"));
    }
    info!(
        "Deleted entry {} of user {} for '{}'",
        entry_number, user_id, tournament.name
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{insert_golfer, insert_tournament, test_league};
    use entity::sea_orm_active_enums::TournamentStatus;

    async fn field_row(ctx: &AppContext, tournament_id: i32, golfer_id: i32, tier: i32) {
        tournament_field::ActiveModel {
            tournament_id: Set(tournament_id),
            golfer_id: Set(golfer_id),
            tier: Set(tier),
            created_at: Set(ctx.now()),
            ..Default::default()
        }
        .insert(&ctx.db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn save_validates_and_notifies() {
        let league = test_league().await;
        let ctx = &league.ctx;
        let t = insert_tournament(&ctx.db, "Masters Tournament", TournamentStatus::Active).await;
        let sam = create_user(&ctx.db, "sam", Some("Sam".into()), false).await.unwrap();
        let mut golfers = Vec::new();
        for tier in 1..=4 {
            let g = insert_golfer(&ctx.db, &tier.to_string(), &format!("Golfer {tier}"), None).await;
            field_row(ctx, t.id, g.id, tier).await;
            golfers.push(g.id);
        }

        let wrong_tier = [Some(golfers[1]), None, None, None];
        assert!(matches!(
            save_entry(ctx, sam.id, t.id, 1, wrong_tier).await,
            Err(GenericError::BadRequest(_))
        ));

        let picks = [Some(golfers[0]), Some(golfers[1]), None, Some(golfers[3])];
        let saved = save_entry(ctx, sam.id, t.id, 1, picks).await.unwrap();
        assert_eq!(saved.picks(), picks);
        let again = save_entry(ctx, sam.id, t.id, 1, [Some(golfers[0]), None, None, None])
            .await
            .unwrap();
        assert_eq!(again.id, saved.id);
        assert_eq!(next_entry_number(&ctx.db, sam.id, t.id).await.unwrap(), 2);

        let messages = league.notifier.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("🏌️ Sam Created Entry 1 for Masters Tournament"));
        assert!(messages[0].contains("Tier 3: -"));
        assert!(messages[1].contains("Updated Entry 1"));
    }

    #[tokio::test]
    async fn locked_tournament_rejects_users_not_admins() {
        let league = test_league().await;
        let ctx = &league.ctx;
        let t = insert_tournament(&ctx.db, "Masters Tournament", TournamentStatus::Active).await;
        let sam = create_user(&ctx.db, "sam", None, false).await.unwrap();
        let g = insert_golfer(&ctx.db, "1", "Golfer 1", None).await;
        save_entry(ctx, sam.id, t.id, 1, [Some(g.id), None, None, None])
            .await
            .unwrap();
        save_entry(ctx, sam.id, t.id, 2, [Some(g.id), None, None, None])
            .await
            .unwrap();
        crate::lifecycle::toggle_lock(ctx, t.id).await.unwrap();

        assert!(matches!(
            save_entry(ctx, sam.id, t.id, 3, [None; 4]).await,
            Err(GenericError::Forbidden(_))
        ));
        assert!(matches!(
            delete_entry(ctx, sam.id, t.id, 1, false).await,
            Err(GenericError::Forbidden(_))
        ));
        crate::scoring::calculate_standings(ctx, t.id).await.unwrap();
        delete_entry(ctx, sam.id, t.id, 1, true).await.unwrap();
        assert!(matches!(
            delete_entry(ctx, sam.id, t.id, 1, true).await,
            Err(GenericError::NotFound(_))
        ));
        let standings = query::standings_view(&ctx.db, t.id).await.unwrap();
        assert_eq!(standings.len(), 1);
        assert_eq!(standings[0].entry_number, 2);
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let league = test_league().await;
        create_user(&league.ctx.db, "sam", None, false).await.unwrap();
        assert!(matches!(
            create_user(&league.ctx.db, " sam ", None, false).await,
            Err(GenericError::Conflict(_))
        ));
    }
}
