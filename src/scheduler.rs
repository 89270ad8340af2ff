use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Utc, Weekday};
use serde::Serialize;
use tracing::{error, info};

use crate::config::Config;
use crate::pipeline::Pipelines;
use crate::types::Pipeline;

/// A wall-clock slot once a week, in a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    pub weekday: Weekday,
    pub time: NaiveTime,
    pub offset: FixedOffset,
}

impl WeeklySchedule {
    /// Parse `"<weekday> HH:MM"`, e.g. `"thu 06:00"` or `"Thursday 18:30"`.
    pub fn parse(s: &str, offset: FixedOffset) -> Option<Self> {
        let mut parts = s.split_whitespace();
        let weekday = parts.next()?.parse::<Weekday>().ok()?;
        let time = NaiveTime::parse_from_str(parts.next()?, "%H:%M").ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self { weekday, time, offset })
    }

    /// The first slot strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&self.offset);
        let days_ahead = (self.weekday.num_days_from_monday() as i64
            - local.weekday().num_days_from_monday() as i64)
            .rem_euclid(7);
        let local_slot = (local.date_naive() + Duration::days(days_ahead)).and_time(self.time);
        let slot = local_slot.and_utc() - Duration::seconds(self.offset.local_minus_utc() as i64);

        if slot > now {
            slot
        } else {
            slot + Duration::weeks(1)
        }
    }
}

impl fmt::Display for WeeklySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} (UTC{})", self.weekday, self.time.format("%H:%M"), self.offset)
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub id: &'static str,
    pub name: &'static str,
    pub pipeline: Pipeline,
    pub schedule: WeeklySchedule,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub id: &'static str,
    pub name: &'static str,
    pub schedule: String,
    pub next_run: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub scheduler_running: bool,
    pub scheduled_jobs: Vec<JobStatus>,
}

/// Weekly ladder and fixtures runs.
pub struct Scheduler {
    enabled: bool,
    jobs: Vec<ScheduledJob>,
}

impl Scheduler {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            enabled: cfg.scheduler_enabled,
            jobs: vec![
                ScheduledJob {
                    id: "weekly-ladder-update",
                    name: "Weekly Ladder Update",
                    pipeline: Pipeline::Ladder,
                    schedule: cfg.ladder_schedule,
                },
                ScheduledJob {
                    id: "weekly-fixtures-update",
                    name: "Weekly Fixtures Update",
                    pipeline: Pipeline::Fixtures,
                    schedule: cfg.fixtures_schedule,
                },
            ],
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Jobs and their next run as seen from `now`. `next_run` is empty while disabled.
    pub fn status(&self, now: DateTime<Utc>) -> SchedulerStatus {
        let jobs = self
            .jobs
            .iter()
            .map(|j| JobStatus {
                id: j.id,
                name: j.name,
                schedule: j.schedule.to_string(),
                next_run: self.enabled.then(|| j.schedule.next_after(now)),
            })
            .collect();
        SchedulerStatus { scheduler_running: self.enabled, scheduled_jobs: jobs }
    }

    /// One background task per job. No-op when disabled.
    pub fn spawn(&self, pipelines: Arc<Pipelines>) {
        if !self.enabled {
            info!("Scheduler disabled; pipelines run only on demand");
            return;
        }
        for job in self.jobs.iter().cloned() {
            let pipelines = Arc::clone(&pipelines);
            info!(job = job.id, schedule = %job.schedule, "Scheduled {}", job.name);
            tokio::spawn(async move { run_job(job, pipelines).await });
        }
    }
}

async fn run_job(job: ScheduledJob, pipelines: Arc<Pipelines>) {
    loop {
        let now = Utc::now();
        let next = job.schedule.next_after(now);
        let wait = (next - now).to_std().unwrap_or_default();
        info!(job = job.id, next_run = %next, "Next {} at {next}", job.name);
        tokio::time::sleep(wait).await;

        info!(job = job.id, "Running scheduled {}", job.name);
        let summary = pipelines.run(job.pipeline, None).await;
        if summary.success {
            info!(job = job.id, "Scheduled {} finished: {}", job.name, summary.message);
        } else {
            error!(job = job.id, "Scheduled {} failed: {}", job.name, summary.message);
        }
    }
}
