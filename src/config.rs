use chrono::FixedOffset;

use crate::error::{AppError, Result};
use crate::scheduler::WeeklySchedule;

pub const LADDER_URL: &str = "https://www.waverleybasketball.com/ladders.aspx?sgid2=4947#ladders";
pub const FIXTURES_URL: &str =
    "https://www.waverleybasketball.com/fixtures.aspx?sgid2=4947&tid=7271#fixtures";

/// Desktop browser agent sent on every scrape request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Upper bound on a single scrape request (connect + body).
pub const FETCH_TIMEOUT_SECS: u64 = 30;

/// Time-of-day stored on games whose kick-off time was never known.
/// A fixture run may overwrite it with a real time; any other time is left alone.
pub const NO_TIME_PLACEHOLDER: (u32, u32) = (12, 0);

/// Ladder data rows with fewer cells than this are layout rows, not teams.
pub const MIN_LADDER_CELLS: usize = 4;

/// Venue text of this many characters or fewer is leftover punctuation, not a venue.
pub const MIN_VENUE_CHARS: usize = 2;

/// Default page size for list endpoints.
pub const DEFAULT_LIST_LIMIT: i64 = 10;

/// How many upcoming games the fixtures status endpoint looks at.
pub const STATUS_LOOKAHEAD_GAMES: i64 = 50;

/// Run-lock names, one per pipeline.
pub const LADDER_LOCK: &str = "ladder-update";
pub const FIXTURES_LOCK: &str = "fixtures-update";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Default ladder page (LADDER_URL). Triggers may override per run.
    pub ladder_url: String,
    /// Default fixtures page (FIXTURES_URL). Triggers may override per run.
    pub fixtures_url: String,
    /// Opaque session cookie for scrape targets behind a login (SCRAPE_SESSION_COOKIE)
    pub session_cookie: Option<String>,
    pub scheduler_enabled: bool,
    /// Weekly ladder run (LADDER_SCHEDULE, e.g. "thu 06:00")
    pub ladder_schedule: WeeklySchedule,
    /// Weekly fixtures run (FIXTURES_SCHEDULE, e.g. "thu 06:05")
    pub fixtures_schedule: WeeklySchedule,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let offset_hours = std::env::var("SCHEDULE_UTC_OFFSET_HOURS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<i32>()
            .map_err(|_| AppError::Config("SCHEDULE_UTC_OFFSET_HOURS must be an integer".to_string()))?;
        let offset = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            AppError::Config(format!("SCHEDULE_UTC_OFFSET_HOURS out of range: {offset_hours}"))
        })?;

        let ladder_schedule = std::env::var("LADDER_SCHEDULE")
            .unwrap_or_else(|_| "thu 06:00".to_string());
        let fixtures_schedule = std::env::var("FIXTURES_SCHEDULE")
            .unwrap_or_else(|_| "thu 06:05".to_string());

        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "club.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            ladder_url: std::env::var("LADDER_URL").unwrap_or_else(|_| LADDER_URL.to_string()),
            fixtures_url: std::env::var("FIXTURES_URL")
                .unwrap_or_else(|_| FIXTURES_URL.to_string()),
            session_cookie: std::env::var("SCRAPE_SESSION_COOKIE")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            scheduler_enabled: std::env::var("SCHEDULER_ENABLED")
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
            ladder_schedule: WeeklySchedule::parse(&ladder_schedule, offset)
                .ok_or_else(|| AppError::Config(format!("invalid LADDER_SCHEDULE: {ladder_schedule}")))?,
            fixtures_schedule: WeeklySchedule::parse(&fixtures_schedule, offset).ok_or_else(|| {
                AppError::Config(format!("invalid FIXTURES_SCHEDULE: {fixtures_schedule}"))
            })?,
        })
    }
}

#[cfg(test)]
impl Config {
    /// Config pointing both scrape targets at a local test server.
    pub fn for_tests(base_url: &str) -> Self {
        let offset = FixedOffset::east_opt(0).expect("zero offset");
        Self {
            log_level: "debug".to_string(),
            db_path: ":memory:".to_string(),
            api_port: 0,
            ladder_url: format!("{base_url}/ladder"),
            fixtures_url: format!("{base_url}/fixtures"),
            session_cookie: None,
            scheduler_enabled: false,
            ladder_schedule: WeeklySchedule::parse("thu 06:00", offset).expect("schedule"),
            fixtures_schedule: WeeklySchedule::parse("thu 06:05", offset).expect("schedule"),
        }
    }
}
