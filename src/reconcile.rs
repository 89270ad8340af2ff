//! Create / update / skip decisions for scraped records against stored rows.
//! Pure functions only; the database side lives in `db::games` and `db::ladder`.

use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, Utc};

use crate::config::NO_TIME_PLACEHOLDER;
use crate::db::models::GameRow;
use crate::types::FixtureRecord;

// ---------------------------------------------------------------------------
// Merge policy
// ---------------------------------------------------------------------------

/// The incoming name when it is strictly longer (taken as more complete).
pub fn prefer_longer(current: &str, incoming: &str) -> Option<String> {
    (incoming.chars().count() > current.chars().count()).then(|| incoming.to_string())
}

/// The incoming value when the current one is missing or blank.
pub fn fill_if_empty(current: Option<&str>, incoming: Option<&str>) -> Option<String> {
    let current_empty = current.map_or(true, |c| c.trim().is_empty());
    match incoming {
        Some(v) if current_empty && !v.trim().is_empty() => Some(v.to_string()),
        _ => None,
    }
}

pub fn placeholder_time() -> NaiveTime {
    let (h, m) = NO_TIME_PLACEHOLDER;
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

/// The incoming kick-off when the stored one only carries the placeholder time.
pub fn replace_placeholder_time(current: NaiveDateTime, incoming: NaiveDateTime) -> Option<NaiveDateTime> {
    let placeholder = placeholder_time();
    (current.time() == placeholder && incoming.time() != placeholder).then_some(incoming)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Case-insensitive substring match in either direction.
pub fn opponents_match(stored: &str, incoming: &str) -> bool {
    let a = stored.trim().to_lowercase();
    let b = incoming.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// First game among `same_day` (games on the fixture's calendar day) that is the same fixture.
pub fn find_match<'a>(same_day: &'a [GameRow], opponent: &str) -> Option<&'a GameRow> {
    same_day.iter().find(|g| opponents_match(&g.opponent_name, opponent))
}

/// Why a fixture never reaches the lookup stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    NoDate,
    NoTime,
    NoOpponent,
}

impl std::fmt::Display for Unresolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Unresolved::NoDate => "no parseable date",
            Unresolved::NoTime => "no parseable time",
            Unresolved::NoOpponent => "no opponent",
        };
        write!(f, "{s}")
    }
}

/// Combine date and time into the kick-off. A missing time is never defaulted.
pub fn resolve_kickoff(rec: &FixtureRecord) -> Result<NaiveDateTime, Unresolved> {
    if rec.opponent_name.trim().is_empty() {
        return Err(Unresolved::NoOpponent);
    }
    let date = rec.date.ok_or(Unresolved::NoDate)?;
    let time = rec.time.ok_or(Unresolved::NoTime)?;
    Ok(date.and_time(time))
}

/// Field-level changes to an upcoming game. `None` = leave as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamePatch {
    pub opponent_name: Option<String>,
    pub scheduled_at: Option<NaiveDateTime>,
    pub venue: Option<String>,
}

impl GamePatch {
    pub fn is_empty(&self) -> bool {
        self.opponent_name.is_none() && self.scheduled_at.is_none() && self.venue.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The game has a recorded score; the reconciler never touches it.
    Completed,
    /// Nothing in the fixture improves on the stored game.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FixtureAction {
    Create,
    Update(GamePatch),
    Skip(SkipReason),
}

/// Decide what a resolved fixture does to the matching stored game, if any.
pub fn plan_fixture(
    existing: Option<&GameRow>,
    kickoff: NaiveDateTime,
    opponent: &str,
    venue: Option<&str>,
) -> FixtureAction {
    let Some(game) = existing else {
        return FixtureAction::Create;
    };

    // A single recorded score already means the game has been played.
    if game.final_score_team.is_some() || game.final_score_opponent.is_some() {
        return FixtureAction::Skip(SkipReason::Completed);
    }

    let patch = GamePatch {
        opponent_name: prefer_longer(&game.opponent_name, opponent),
        scheduled_at: replace_placeholder_time(game.scheduled_at, kickoff),
        venue: fill_if_empty(game.venue.as_deref(), venue),
    };

    if patch.is_empty() {
        FixtureAction::Skip(SkipReason::Unchanged)
    } else {
        FixtureAction::Update(patch)
    }
}

// ---------------------------------------------------------------------------
// Ladder
// ---------------------------------------------------------------------------

/// January–June is the winter season, July–December the spring season.
pub fn season_label(now: DateTime<Utc>) -> String {
    if now.month() < 7 {
        format!("{} Winter", now.year())
    } else {
        format!("{} Spring", now.year())
    }
}
