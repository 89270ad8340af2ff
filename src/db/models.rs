use chrono::NaiveDateTime;
use serde::Serialize;

/// Row of the `games` table. `scheduled_at` is the local kick-off time.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct GameRow {
    pub id: i64,
    pub opponent_name: String,
    pub scheduled_at: NaiveDateTime,
    pub venue: Option<String>,
    pub final_score_team: Option<i64>,
    pub final_score_opponent: Option<i64>,
    pub video_url: Option<String>,
    pub created_at: i64,
}

impl GameRow {
    pub fn has_scores(&self) -> bool {
        self.final_score_team.is_some() && self.final_score_opponent.is_some()
    }
}

/// Row of the `ladder_entries` table. All rows of one snapshot share `last_updated`.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct LadderEntryRow {
    pub id: i64,
    pub team_name: String,
    pub position: i64,
    pub wins: i64,
    pub draws: i64,
    pub losses: i64,
    pub points_for: i64,
    pub points_against: i64,
    pub win_percentage: f64,
    pub games_played: i64,
    pub season: Option<String>,
    pub division: Option<String>,
    pub last_updated: i64,
    pub created_at: i64,
}
