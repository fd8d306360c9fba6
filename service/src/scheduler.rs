//! Periodic background jobs driven by tokio intervals.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Weekday};
use log::{debug, error, info};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::context::AppContext;
use crate::error::GenericError;

#[rocket::async_trait]
pub trait Task: Send + Sync {
    /// Returns a one-line summary for the log.
    async fn run(&self, ctx: &AppContext) -> Result<String, GenericError>;
}

#[derive(Clone)]
pub struct ScheduledJob {
    pub name: &'static str,
    pub every: Duration,
    /// Days (league time) the job may run on. `None` means every day.
    pub weekdays: Option<Vec<Weekday>>,
    pub task: Arc<dyn Task>,
}

impl ScheduledJob {
    pub fn new(name: &'static str, every: Duration, task: impl Task + 'static) -> Self {
        Self {
            name,
            every,
            weekdays: None,
            task: Arc::new(task),
        }
    }

    pub fn on(mut self, weekdays: &[Weekday]) -> Self {
        self.weekdays = Some(weekdays.to_vec());
        self
    }

    pub fn runs_on(&self, day: Weekday) -> bool {
        self.weekdays
            .as_ref()
            .map_or(true, |days| days.contains(&day))
    }

    /// One tick: skipped outside the weekday filter, failures are logged.
    pub async fn tick(&self, ctx: &AppContext) -> Option<String> {
        let today = ctx.today().weekday();
        if !self.runs_on(today) {
            debug!("Skipping {} on {}", self.name, today);
            return None;
        }
        match self.task.run(ctx).await {
            Ok(summary) => {
                info!("{}: {}", self.name, summary);
                Some(summary)
            }
            Err(e) => {
                error!("{} failed: {}", self.name, e);
                None
            }
        }
    }
}

pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
}

impl Scheduler {
    pub fn new(jobs: Vec<ScheduledJob>) -> Self {
        Self { jobs }
    }

    /// Spawns one loop per job. The first tick fires immediately and ticks
    /// missed while a run was still busy are dropped.
    pub fn spawn(self, ctx: AppContext) -> Vec<JoinHandle<()>> {
        self.jobs
            .into_iter()
            .map(|job| {
                let ctx = ctx.clone();
                info!("Scheduling {} every {:?}", job.name, job.every);
                tokio::spawn(async move {
                    let mut interval = tokio::time::interval(job.every);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    loop {
                        interval.tick().await;
                        job.tick(&ctx).await;
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_league;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(Arc<AtomicUsize>);

    #[rocket::async_trait]
    impl Task for Counter {
        async fn run(&self, _ctx: &AppContext) -> Result<String, GenericError> {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("run {n}"))
        }
    }

    struct Failing;

    #[rocket::async_trait]
    impl Task for Failing {
        async fn run(&self, _ctx: &AppContext) -> Result<String, GenericError> {
            Err(GenericError::Feed("down".to_string()))
        }
    }

    #[tokio::test]
    async fn weekday_filter_uses_league_date() {
        let league = test_league().await;
        let count = Arc::new(AtomicUsize::new(0));
        let job = ScheduledJob::new("count", Duration::from_secs(60), Counter(count.clone()))
            .on(&[Weekday::Sun, Weekday::Mon]);

        // 2025-04-08 is a Tuesday.
        assert_eq!(job.tick(&league.ctx).await, None);
        league.clock.advance(chrono::Duration::days(5));
        assert_eq!(job.tick(&league.ctx).await, Some("run 1".to_string()));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_do_not_escape() {
        let league = test_league().await;
        let job = ScheduledJob::new("fail", Duration::from_secs(60), Failing);
        assert_eq!(job.tick(&league.ctx).await, None);
    }

    #[tokio::test]
    async fn runs_immediately_then_every_period() {
        let league = test_league().await;
        tokio::time::pause();
        let count = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::new(vec![ScheduledJob::new(
            "count",
            Duration::from_secs(3 * 3600),
            Counter(count.clone()),
        )]);
        let handles = scheduler.spawn(league.ctx.clone());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_secs(3 * 3600)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        for handle in handles {
            handle.abort();
        }
    }
}
