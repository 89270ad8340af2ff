use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error, info, warn};

use crate::db::models::GameRow;
use crate::db::now_ns;
use crate::error::Result;
use crate::reconcile::{find_match, plan_fixture, resolve_kickoff, FixtureAction, GamePatch, SkipReason};
use crate::types::{FixtureRecord, Outcome, RunCounts};

const GAME_COLUMNS: &str = "id, opponent_name, scheduled_at, venue, final_score_team, \
                            final_score_opponent, video_url, created_at";

fn day_bounds(day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = day.and_time(NaiveTime::MIN);
    (start, start + Duration::days(1))
}

/// Games scheduled on `day`, oldest row first.
pub async fn games_on_day(conn: &mut SqliteConnection, day: NaiveDate) -> Result<Vec<GameRow>> {
    let (start, end) = day_bounds(day);
    let rows = sqlx::query_as::<_, GameRow>(&format!(
        "SELECT {GAME_COLUMNS} FROM games WHERE scheduled_at >= ? AND scheduled_at < ? ORDER BY id"
    ))
    .bind(start)
    .bind(end)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn insert_game(
    conn: &mut SqliteConnection,
    opponent: &str,
    scheduled_at: NaiveDateTime,
    venue: Option<&str>,
) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO games (opponent_name, scheduled_at, venue, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(opponent)
    .bind(scheduled_at)
    .bind(venue)
    .bind(now_ns())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    Ok(id)
}

pub async fn apply_patch(conn: &mut SqliteConnection, id: i64, patch: &GamePatch) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE games SET
            opponent_name = COALESCE(?, opponent_name),
            scheduled_at  = COALESCE(?, scheduled_at),
            venue         = COALESCE(?, venue)
        WHERE id = ?
        "#,
    )
    .bind(patch.opponent_name.as_deref())
    .bind(patch.scheduled_at)
    .bind(patch.venue.as_deref())
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Reconcile one scraped fixture against the stored games.
pub async fn reconcile_fixture(conn: &mut SqliteConnection, rec: &FixtureRecord) -> Result<Outcome> {
    let kickoff = match resolve_kickoff(rec) {
        Ok(k) => k,
        Err(reason) => {
            warn!(
                opponent = %rec.opponent_name,
                date = rec.date_text.as_deref().unwrap_or("-"),
                time = rec.time_text.as_deref().unwrap_or("-"),
                "Skipping fixture vs {}: {reason}",
                rec.opponent_name,
            );
            return Ok(Outcome::Skipped);
        }
    };
    let opponent = rec.opponent_name.trim();

    let same_day = games_on_day(conn, kickoff.date()).await?;
    let existing = find_match(&same_day, opponent);

    match plan_fixture(existing, kickoff, opponent, rec.venue.as_deref()) {
        FixtureAction::Create => {
            let id = insert_game(conn, opponent, kickoff, rec.venue.as_deref()).await?;
            info!(game_id = id, opponent = %opponent, kickoff = %kickoff, "Created game vs {opponent} on {kickoff}");
            Ok(Outcome::Created)
        }
        FixtureAction::Update(patch) => {
            // plan_fixture only returns Update for an existing game
            let Some(game) = existing else {
                return Ok(Outcome::Skipped);
            };
            apply_patch(conn, game.id, &patch).await?;
            info!(game_id = game.id, ?patch, "Updated game vs {} on {}", game.opponent_name, game.scheduled_at);
            Ok(Outcome::Updated)
        }
        FixtureAction::Skip(reason) => {
            if let Some(game) = existing {
                let why = match reason {
                    SkipReason::Completed => "already played",
                    SkipReason::Unchanged => "nothing new",
                };
                info!(game_id = game.id, "Skipped game vs {} on {} ({why})", game.opponent_name, game.scheduled_at);
            }
            Ok(Outcome::Skipped)
        }
    }
}

/// Reconcile every record on one connection (normally an open transaction).
/// A record that fails is counted as skipped; the rest carry on.
pub async fn reconcile_fixtures(conn: &mut SqliteConnection, records: &[FixtureRecord]) -> RunCounts {
    let mut counts = RunCounts::default();
    for rec in records {
        let outcome = match reconcile_fixture(conn, rec).await {
            Ok(o) => o,
            Err(e) => {
                error!(opponent = %rec.opponent_name, "Error processing fixture: {e}");
                Outcome::Skipped
            }
        };
        debug!(opponent = %rec.opponent_name, %outcome, "Fixture {outcome}");
        counts.record(outcome);
    }
    counts
}

/// Scoreless games from the start of `today` on, earliest first.
pub async fn upcoming_games(pool: &SqlitePool, today: NaiveDate, limit: i64) -> Result<Vec<GameRow>> {
    let (start, _) = day_bounds(today);
    let rows = sqlx::query_as::<_, GameRow>(&format!(
        r#"
        SELECT {GAME_COLUMNS} FROM games
        WHERE scheduled_at >= ?
          AND final_score_team IS NULL
          AND final_score_opponent IS NULL
        ORDER BY scheduled_at ASC
        LIMIT ?
        "#
    ))
    .bind(start)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
