use std::error::Error;

use log::info;
use migration::{Migrator, MigratorTrait};
use service::config::Settings;
use service::jobs::standard_jobs;
use service::scheduler::Scheduler;
use service::AppContext;

#[rocket::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let settings = Settings::from_env()?;
    let ctx = AppContext::from_settings(settings).await?;

    // Igniting installs Rocket's logger, everything after this point is logged.
    let rocket = api::build(ctx.clone()).ignite().await?;
    Migrator::up(ctx.db.current().as_ref(), None).await?;
    info!("Migrations applied");

    Scheduler::new(standard_jobs()).spawn(ctx);
    rocket.launch().await?;
    Ok(())
}
