use chrono::Datelike;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::Serialize;

use service::query::{
    self, FieldRow, GolferResultRow, SeasonRow, StandingRow, TournamentOverview, TournamentRow,
};
use service::{purse, sync, AppContext, GenericError};

use crate::admin::AdminOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct StandingsView {
    pub tournament: TournamentRow,
    /// Set when live scores could not be refreshed before this view.
    pub notice: Option<String>,
    pub purse: Option<i64>,
    pub standings: Vec<StandingRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct SeasonView {
    /// `None` until some tournament has been completed.
    pub year: Option<i32>,
    pub available_years: Vec<i32>,
    pub tournament_count: usize,
    pub standings: Vec<SeasonRow>,
}

async fn season_view(ctx: &AppContext, year: Option<i32>) -> Result<SeasonView, GenericError> {
    let available_years = query::season_years(&ctx.db).await?;
    let current = ctx.today().year();
    let year = year.or_else(|| {
        available_years
            .contains(&current)
            .then_some(current)
            .or_else(|| available_years.first().copied())
    });
    let Some(season) = year else {
        return Ok(SeasonView {
            year: None,
            available_years,
            tournament_count: 0,
            standings: Vec::new(),
        });
    };
    Ok(SeasonView {
        year: Some(season),
        available_years,
        tournament_count: query::season_tournaments(&ctx.db, Some(season)).await?.len(),
        standings: query::season_standings(&ctx.db, Some(season)).await?,
    })
}

/// # Season leaderboard
///
/// The league's current year when it has completed tournaments, otherwise the
/// most recent year that does.
#[openapi(tag = "Season")]
#[get("/season")]
pub(crate) async fn season(ctx: &State<AppContext>) -> Result<Json<SeasonView>, GenericError> {
    Ok(Json(season_view(ctx.inner(), None).await?))
}

#[openapi(tag = "Season")]
#[get("/season/<year>")]
pub(crate) async fn season_for_year(
    ctx: &State<AppContext>,
    year: i32,
) -> Result<Json<SeasonView>, GenericError> {
    Ok(Json(season_view(ctx.inner(), Some(year)).await?))
}

#[openapi(tag = "Tournament")]
#[get("/tournaments")]
pub(crate) async fn tournaments(
    ctx: &State<AppContext>,
) -> Result<Json<TournamentOverview>, GenericError> {
    Ok(Json(query::tournament_overview(&ctx.db).await?))
}

/// # Pick'em standings
///
/// Results of an active tournament are synced first when they are stale.
#[openapi(tag = "Tournament")]
#[get("/tournament/<id>/standings")]
pub(crate) async fn standings(
    ctx: &State<AppContext>,
    id: i32,
) -> Result<Json<StandingsView>, GenericError> {
    let notice = sync::refresh_if_stale(ctx.inner(), id).await?;
    let tournament = query::tournament(&ctx.db, id).await?;
    let purse = purse::tournament_purse(&ctx.db, &tournament).await?;
    let standings = query::standings_view(&ctx.db, id).await?;
    Ok(Json(StandingsView {
        tournament: tournament.into(),
        notice,
        purse,
        standings,
    }))
}

#[openapi(tag = "Tournament")]
#[get("/tournament/<id>/leaderboard")]
pub(crate) async fn leaderboard(
    ctx: &State<AppContext>,
    id: i32,
) -> Result<Json<Vec<GolferResultRow>>, GenericError> {
    query::tournament(&ctx.db, id).await?;
    Ok(Json(query::tournament_leaderboard(&ctx.db, id).await?))
}

#[openapi(tag = "Tournament")]
#[get("/tournament/<id>/field")]
pub(crate) async fn field(
    ctx: &State<AppContext>,
    id: i32,
) -> Result<Json<Vec<FieldRow>>, GenericError> {
    query::tournament(&ctx.db, id).await?;
    Ok(Json(query::field_view(&ctx.db, id).await?))
}

/// # Refresh live scores
///
/// At most one successful refresh per tournament per cooldown window.
#[openapi(tag = "Tournament")]
#[post("/tournament/<id>/refresh")]
pub(crate) async fn refresh(
    ctx: &State<AppContext>,
    id: i32,
) -> Result<Json<AdminOutcome>, GenericError> {
    Ok(AdminOutcome::ok(sync::manual_refresh(ctx.inner(), id).await?))
}
