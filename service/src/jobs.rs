//! The league's recurring jobs.

use std::time::Duration;

use chrono::Weekday;

use crate::context::AppContext;
use crate::error::GenericError;
use crate::lifecycle;
use crate::scheduler::{ScheduledJob, Task};

const HOUR: u64 = 60 * 60;

fn summary(verb: &str, names: Vec<String>) -> String {
    if names.is_empty() {
        format!("nothing {verb}")
    } else {
        format!("{verb} {}", names.join(", "))
    }
}

pub struct ActivateTournaments;

#[rocket::async_trait]
impl Task for ActivateTournaments {
    async fn run(&self, ctx: &AppContext) -> Result<String, GenericError> {
        Ok(summary("activated", lifecycle::activate_due(ctx).await?))
    }
}

pub struct LockPicks;

#[rocket::async_trait]
impl Task for LockPicks {
    async fn run(&self, ctx: &AppContext) -> Result<String, GenericError> {
        Ok(summary("locked", lifecycle::lock_due(ctx).await?))
    }
}

pub struct CompleteTournaments;

#[rocket::async_trait]
impl Task for CompleteTournaments {
    async fn run(&self, ctx: &AppContext) -> Result<String, GenericError> {
        Ok(summary("completed", lifecycle::complete_finished(ctx).await?))
    }
}

pub fn standard_jobs() -> Vec<ScheduledJob> {
    vec![
        ScheduledJob::new(
            "activate-tournaments",
            Duration::from_secs(24 * HOUR),
            ActivateTournaments,
        ),
        ScheduledJob::new("lock-picks", Duration::from_secs(3 * HOUR), LockPicks),
        // Events end on Sunday, late finishes spill into Monday.
        ScheduledJob::new(
            "complete-tournaments",
            Duration::from_secs(2 * HOUR),
            CompleteTournaments,
        )
        .on(&[Weekday::Sun, Weekday::Mon]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{insert_tournament_starting, test_league};
    use chrono::NaiveDate;

    #[test]
    fn standard_schedule() {
        let jobs = standard_jobs();
        let names = jobs.iter().map(|j| j.name).collect::<Vec<_>>();
        assert_eq!(names, ["activate-tournaments", "lock-picks", "complete-tournaments"]);
        assert!(jobs[0].runs_on(Weekday::Wed));
        assert!(!jobs[2].runs_on(Weekday::Sat));
        assert!(jobs[2].runs_on(Weekday::Mon));
    }

    #[tokio::test]
    async fn activation_job_reports_names() {
        let league = test_league().await;
        let start = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();
        insert_tournament_starting(&league.ctx.db, "Masters Tournament", start).await;

        let jobs = standard_jobs();
        assert_eq!(
            jobs[0].tick(&league.ctx).await,
            Some("activated Masters Tournament".to_string())
        );
        assert_eq!(
            jobs[0].tick(&league.ctx).await,
            Some("nothing activated".to_string())
        );
    }
}
