use entity::prelude::*;
use entity::*;
use itertools::Itertools;
use log::info;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use sea_orm::IntoActiveModel;

use crate::context::AppContext;
use crate::error::GenericError;
use crate::query;

/// Prize pool from per-user entry counts. A user with three or more entries pays
/// the bundle price when one is set, everyone else pays per entry. `None` when the
/// tournament has no entry price.
pub fn compute_purse(
    entry_price: Option<i32>,
    three_entry_price: Option<i32>,
    entries_per_user: impl IntoIterator<Item = usize>,
) -> Option<i64> {
    let entry_price = i64::from(entry_price.filter(|p| *p > 0)?);
    let bundle = three_entry_price.filter(|p| *p > 0).map(i64::from);
    Some(
        entries_per_user
            .into_iter()
            .map(|count| match bundle {
                Some(bundle) if count >= 3 => bundle,
                _ => count as i64 * entry_price,
            })
            .sum(),
    )
}

pub async fn tournament_purse(
    db: &impl ConnectionTrait,
    tournament: &tournament::Model,
) -> Result<Option<i64>, GenericError> {
    if tournament.entry_price.is_none() {
        return Ok(None);
    }
    let entries = Entry::find()
        .filter(entry::Column::TournamentId.eq(tournament.id))
        .all(db)
        .await?;
    let counts = entries.iter().counts_by(|e| e.user_id);
    Ok(compute_purse(
        tournament.entry_price,
        tournament.three_entry_price,
        counts.into_values(),
    ))
}

/// Sets the entry prices. Zero or a missing value clears a price.
pub async fn set_pricing(
    ctx: &AppContext,
    tournament_id: i32,
    entry_price: Option<i32>,
    three_entry_price: Option<i32>,
) -> Result<tournament::Model, GenericError> {
    if entry_price.is_some_and(|p| p < 0) || three_entry_price.is_some_and(|p| p < 0) {
        return Err(GenericError::BadRequest("Prices must not be negative"));
    }
    let tournament = query::tournament(&ctx.db, tournament_id).await?;
    let mut model = tournament.into_active_model();
    model.entry_price = Set(entry_price.filter(|p| *p > 0));
    model.three_entry_price = Set(three_entry_price.filter(|p| *p > 0));
    model.updated_at = Set(ctx.now());
    let updated = model.update(&ctx.db).await?;
    info!(
        "Pricing for '{}': {:?} per entry, {:?} for three",
        updated.name, updated.entry_price, updated.three_entry_price
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{insert_tournament, insert_user, test_league};
    use entity::sea_orm_active_enums::TournamentStatus;

    #[test]
    fn per_entry_pricing() {
        assert_eq!(compute_purse(Some(20), None, [1, 2]), Some(60));
    }

    #[test]
    fn bundle_applies_from_three_entries() {
        assert_eq!(compute_purse(Some(20), Some(50), [3, 1, 2]), Some(50 + 20 + 40));
        assert_eq!(compute_purse(Some(20), Some(50), [4]), Some(50));
    }

    #[test]
    fn zero_bundle_means_no_discount() {
        assert_eq!(compute_purse(Some(20), Some(0), [3]), Some(60));
    }

    #[test]
    fn no_price_no_purse() {
        assert_eq!(compute_purse(None, Some(50), [3]), None);
        assert_eq!(compute_purse(Some(20), None, Vec::<usize>::new()), Some(0));
    }

    #[tokio::test]
    async fn purse_follows_stored_entries() {
        let league = test_league().await;
        let ctx = &league.ctx;
        let t = insert_tournament(&ctx.db, "Masters Tournament", TournamentStatus::Active).await;
        let unpriced = tournament_purse(&ctx.db, &t).await.unwrap();
        assert_eq!(unpriced, None);

        let t = set_pricing(ctx, t.id, Some(20), Some(50)).await.unwrap();
        let sam = insert_user(&ctx.db, "sam").await;
        let alex = insert_user(&ctx.db, "alex").await;
        for (user, number) in [(sam.id, 1), (sam.id, 2), (sam.id, 3), (alex.id, 1)] {
            entry::ActiveModel {
                user_id: Set(user),
                tournament_id: Set(t.id),
                entry_number: Set(number),
                created_at: Set(ctx.now()),
                updated_at: Set(ctx.now()),
                ..Default::default()
            }
            .insert(&ctx.db)
            .await
            .unwrap();
        }
        assert_eq!(tournament_purse(&ctx.db, &t).await.unwrap(), Some(70));

        assert!(matches!(
            set_pricing(ctx, t.id, Some(-5), None).await,
            Err(GenericError::BadRequest(_))
        ));
    }
}
