use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{FIXTURES_LOCK, LADDER_LOCK};

// ---------------------------------------------------------------------------
// Scraped records
// ---------------------------------------------------------------------------

/// One team's standing as read from a ladder table. Lives only for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderRecord {
    pub team_name: String,
    pub wins: i64,
    pub draws: i64,
    pub losses: i64,
    pub points_for: i64,
    pub points_against: i64,
    /// 0.0–1.0
    pub win_percentage: f64,
    pub games_played: i64,
    pub division: Option<String>,
}

impl LadderRecord {
    pub fn empty() -> Self {
        Self {
            team_name: String::new(),
            wins: 0,
            draws: 0,
            losses: 0,
            points_for: 0,
            points_against: 0,
            win_percentage: 0.0,
            games_played: 0,
            division: None,
        }
    }
}

/// One upcoming game as read from a fixtures table.
///
/// `date` and `time` are `None` when the cell text matched nothing usable; such
/// records survive extraction and are dropped (with a warning) by the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureRecord {
    pub opponent_name: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub venue: Option<String>,
    /// Raw matched substrings, kept for log lines.
    pub date_text: Option<String>,
    pub time_text: Option<String>,
}

// ---------------------------------------------------------------------------
// Pipelines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pipeline {
    Ladder,
    Fixtures,
}

impl Pipeline {
    /// Name of the run lock serialising this pipeline.
    pub fn lock_name(self) -> &'static str {
        match self {
            Pipeline::Ladder => LADDER_LOCK,
            Pipeline::Fixtures => FIXTURES_LOCK,
        }
    }
}

impl std::fmt::Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Pipeline::Ladder => "ladder",
            Pipeline::Fixtures => "fixtures",
        };
        write!(f, "{s}")
    }
}

/// Per-record decision made by the fixtures reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Created,
    Updated,
    Skipped,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Outcome::Created => "created",
            Outcome::Updated => "updated",
            Outcome::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub total: u64,
}

impl RunCounts {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Skipped => self.skipped += 1,
        }
        self.total += 1;
    }
}

/// What every trigger (timer or operator) gets back from a pipeline run.
/// A run never surfaces a raw error; failures are `success: false` with zero counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub pipeline: Pipeline,
    pub success: bool,
    pub message: String,
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub total: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn completed(
        pipeline: Pipeline,
        message: impl Into<String>,
        counts: RunCounts,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            pipeline,
            success: true,
            message: message.into(),
            created: counts.created,
            updated: counts.updated,
            skipped: counts.skipped,
            total: counts.total,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn failed(pipeline: Pipeline, message: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            pipeline,
            success: false,
            message: message.into(),
            created: 0,
            updated: 0,
            skipped: 0,
            total: 0,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn counts(&self) -> RunCounts {
        RunCounts {
            created: self.created,
            updated: self.updated,
            skipped: self.skipped,
            total: self.total,
        }
    }
}
