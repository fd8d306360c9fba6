use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use service::{entries, lifecycle, notify, purse, scoring, sync, AppContext, GenericError};

use crate::guard::AdminKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AdminOutcome {
    pub success: bool,
    pub message: String,
}

impl AdminOutcome {
    pub fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

type AdminResult = Result<Json<AdminOutcome>, GenericError>;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PricingInput {
    pub entry_price: Option<i32>,
    pub three_entry_price: Option<i32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NewUserInput {
    pub username: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

/// Picked golfer ids, one per tier. Missing tiers stay empty.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct PicksInput {
    pub tier1: Option<i32>,
    pub tier2: Option<i32>,
    pub tier3: Option<i32>,
    pub tier4: Option<i32>,
}

/// # Sync golfers and schedule
///
/// Pulls the player list, skill rankings and upcoming events from the feed.
#[openapi(tag = "Admin")]
#[post("/admin/sync")]
pub(crate) async fn sync_all(ctx: &State<AppContext>, _admin: AdminKey) -> AdminResult {
    Ok(AdminOutcome::ok(sync::full_sync(ctx.inner()).await?))
}

/// # Sync live results
///
/// Replaces the tournament's results with the feed's live snapshot and
/// recalculates its standings. Answers 409 when the feed is on another event.
#[openapi(tag = "Admin")]
#[post("/admin/tournament/<id>/sync-results")]
pub(crate) async fn sync_results(
    ctx: &State<AppContext>,
    _admin: AdminKey,
    id: i32,
) -> AdminResult {
    let outcome = sync::sync_results(ctx.inner(), id).await?;
    Ok(AdminOutcome::ok(format!(
        "Synced {} results{}",
        outcome.rows,
        if outcome.event_finished {
            ", the event is finished"
        } else {
            ""
        }
    )))
}

#[openapi(tag = "Admin")]
#[post("/admin/tournament/<id>/toggle-lock")]
pub(crate) async fn toggle_lock(ctx: &State<AppContext>, _admin: AdminKey, id: i32) -> AdminResult {
    let locked = lifecycle::toggle_lock(ctx.inner(), id).await?;
    Ok(AdminOutcome::ok(if locked {
        "Picks locked"
    } else {
        "Picks unlocked"
    }))
}

/// # Force activate
///
/// Makes this the only active tournament. Any other active tournament goes
/// back to upcoming.
#[openapi(tag = "Admin")]
#[post("/admin/tournament/<id>/activate")]
pub(crate) async fn activate(ctx: &State<AppContext>, _admin: AdminKey, id: i32) -> AdminResult {
    Ok(AdminOutcome::ok(lifecycle::force_activate(ctx.inner(), id).await?))
}

#[openapi(tag = "Admin")]
#[post("/admin/tournament/<id>/complete")]
pub(crate) async fn complete(ctx: &State<AppContext>, _admin: AdminKey, id: i32) -> AdminResult {
    Ok(AdminOutcome::ok(lifecycle::force_complete(ctx.inner(), id).await?))
}

#[openapi(tag = "Admin")]
#[post("/admin/standings/recalculate")]
pub(crate) async fn recalculate(ctx: &State<AppContext>, _admin: AdminKey) -> AdminResult {
    let count = scoring::recalculate_all(ctx.inner()).await?;
    Ok(AdminOutcome::ok(format!(
        "Recalculated standings for {count} tournaments"
    )))
}

/// # Auto-assign the field
///
/// Splits the feed's current field into four tiers by skill estimate.
#[openapi(tag = "Admin")]
#[post("/admin/tournament/<id>/field/auto")]
pub(crate) async fn auto_field(ctx: &State<AppContext>, _admin: AdminKey, id: i32) -> AdminResult {
    let count = sync::auto_assign_field(ctx.inner(), id).await?;
    Ok(AdminOutcome::ok(format!("Assigned {count} golfers to tiers")))
}

#[openapi(tag = "Admin")]
#[post("/admin/field/<field_id>/tier/<tier>")]
pub(crate) async fn move_tier(
    ctx: &State<AppContext>,
    _admin: AdminKey,
    field_id: i32,
    tier: i32,
) -> AdminResult {
    let row = sync::move_tier(ctx.inner(), field_id, tier).await?;
    Ok(AdminOutcome::ok(format!(
        "Moved golfer {} to tier {}",
        row.golfer_id, row.tier
    )))
}

#[openapi(tag = "Admin")]
#[put("/admin/tournament/<id>/pricing", format = "json", data = "<pricing>")]
pub(crate) async fn set_pricing(
    ctx: &State<AppContext>,
    _admin: AdminKey,
    id: i32,
    pricing: Json<PricingInput>,
) -> AdminResult {
    let pricing = pricing.into_inner();
    let t = purse::set_pricing(ctx.inner(), id, pricing.entry_price, pricing.three_entry_price)
        .await?;
    Ok(AdminOutcome::ok(format!("Updated pricing for {}", t.name)))
}

/// # Announce the leaderboard
///
/// Sends the current top ten to the group chat.
#[openapi(tag = "Admin")]
#[post("/admin/tournament/<id>/announce")]
pub(crate) async fn announce(ctx: &State<AppContext>, _admin: AdminKey, id: i32) -> AdminResult {
    Ok(AdminOutcome::ok(
        notify::announce_leaderboard(ctx.inner(), id).await?,
    ))
}

#[openapi(tag = "Admin")]
#[post("/admin/users", format = "json", data = "<user>")]
pub(crate) async fn create_user(
    ctx: &State<AppContext>,
    _admin: AdminKey,
    user: Json<NewUserInput>,
) -> AdminResult {
    let input = user.into_inner();
    let user = entries::create_user(
        &ctx.db,
        &input.username,
        input.display_name,
        input.is_admin,
    )
    .await?;
    Ok(AdminOutcome::ok(format!(
        "Created user '{}' with id {}",
        user.username, user.id
    )))
}

/// # Save an entry
///
/// Creates or replaces a member's entry. Follows the same rules as a member
/// saving it: the tournament must be active with picks open.
#[openapi(tag = "Admin")]
#[put(
    "/admin/tournament/<id>/entry/<user_id>/<entry_number>",
    format = "json",
    data = "<picks>"
)]
pub(crate) async fn save_entry(
    ctx: &State<AppContext>,
    _admin: AdminKey,
    id: i32,
    user_id: i32,
    entry_number: i32,
    picks: Json<PicksInput>,
) -> AdminResult {
    let p = picks.into_inner();
    entries::save_entry(
        ctx.inner(),
        user_id,
        id,
        entry_number,
        [p.tier1, p.tier2, p.tier3, p.tier4],
    )
    .await?;
    Ok(AdminOutcome::ok(format!(
        "Saved entry {entry_number} for user {user_id}"
    )))
}

#[openapi(tag = "Admin")]
#[delete("/admin/tournament/<id>/entry/<user_id>/<entry_number>")]
pub(crate) async fn delete_entry(
    ctx: &State<AppContext>,
    _admin: AdminKey,
    id: i32,
    user_id: i32,
    entry_number: i32,
) -> AdminResult {
    entries::delete_entry(ctx.inner(), user_id, id, entry_number, true).await?;
    Ok(AdminOutcome::ok(format!(
        "Deleted entry {entry_number} for user {user_id}"
    )))
}
