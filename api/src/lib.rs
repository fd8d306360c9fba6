mod admin;
mod guard;
mod leaderboard;

#[macro_use]
extern crate rocket;

use rocket::{Build, Rocket};
use rocket_okapi::openapi_get_routes;
use rocket_okapi::rapidoc::{make_rapidoc, GeneralConfig, HideShowConfig, RapiDocConfig};
use rocket_okapi::settings::UrlObject;
use rocket_okapi::swagger_ui::{make_swagger_ui, SwaggerUIConfig};
use service::AppContext;

pub use admin::AdminOutcome;
pub use guard::ADMIN_KEY_HEADER;
pub use leaderboard::{SeasonView, StandingsView};

#[catch(404)]
fn general_not_found() -> &'static str {
    "Api endpoint not found"
}

#[catch(403)]
fn forbidden() -> &'static str {
    "Administrator key required"
}

/// The league's HTTP surface over an already wired context.
pub fn build(ctx: AppContext) -> Rocket<Build> {
    rocket::build()
        .manage(ctx)
        .mount(
            "/api",
            openapi_get_routes![
                admin::sync_all,
                admin::sync_results,
                admin::toggle_lock,
                admin::activate,
                admin::complete,
                admin::recalculate,
                admin::auto_field,
                admin::move_tier,
                admin::set_pricing,
                admin::announce,
                admin::create_user,
                admin::save_entry,
                admin::delete_entry,
                leaderboard::tournaments,
                leaderboard::standings,
                leaderboard::leaderboard,
                leaderboard::field,
                leaderboard::refresh,
                leaderboard::season,
                leaderboard::season_for_year,
            ],
        )
        .mount(
            "/api/swagger",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api/rapidoc",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("General", "../openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
        .register("/api", catchers![general_not_found, forbidden])
}
