use chrono::{DateTime, Duration, NaiveTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::db::models::LadderEntryRow;
use crate::error::Result;
use crate::reconcile::season_label;
use crate::types::LadderRecord;

const LADDER_COLUMNS: &str = "id, team_name, position, wins, draws, losses, points_for, \
                              points_against, win_percentage, games_played, season, division, \
                              last_updated, created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotWrite {
    pub inserted: u64,
    /// Rows from earlier same-day snapshots that were deleted first.
    pub replaced: u64,
    /// Shared `last_updated` of the new snapshot.
    pub snapshot_id: i64,
}

fn ns(t: DateTime<Utc>) -> i64 {
    t.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Replace today's (UTC) snapshot with `rows`. Position is table order, 1-based.
/// Run inside a transaction so a failure leaves the previous state visible.
pub async fn replace_snapshot(
    conn: &mut SqliteConnection,
    rows: &[LadderRecord],
    now: DateTime<Utc>,
) -> Result<SnapshotWrite> {
    let day_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let day_end = day_start + Duration::days(1);

    let replaced = sqlx::query("DELETE FROM ladder_entries WHERE last_updated >= ? AND last_updated < ?")
        .bind(ns(day_start))
        .bind(ns(day_end))
        .execute(&mut *conn)
        .await?
        .rows_affected();

    let snapshot_id = ns(now);
    let season = season_label(now);

    for (idx, r) in rows.iter().enumerate() {
        let position = idx as i64 + 1;
        sqlx::query(
            r#"
            INSERT INTO ladder_entries (
                team_name, position, wins, draws, losses, points_for, points_against,
                win_percentage, games_played, season, division, last_updated, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&r.team_name)
        .bind(position)
        .bind(r.wins)
        .bind(r.draws)
        .bind(r.losses)
        .bind(r.points_for)
        .bind(r.points_against)
        .bind(r.win_percentage)
        .bind(r.games_played)
        .bind(&season)
        .bind(r.division.as_deref())
        .bind(snapshot_id)
        .bind(snapshot_id)
        .execute(&mut *conn)
        .await?;
    }

    info!(
        inserted = rows.len(),
        replaced,
        season = %season,
        "Wrote ladder snapshot of {} teams ({} same-day rows replaced)",
        rows.len(),
        replaced,
    );

    Ok(SnapshotWrite { inserted: rows.len() as u64, replaced, snapshot_id })
}

/// `last_updated` of the newest snapshot.
pub async fn latest_snapshot_id(pool: &SqlitePool) -> Result<Option<i64>> {
    let id: Option<i64> = sqlx::query_scalar("SELECT MAX(last_updated) FROM ladder_entries")
        .fetch_one(pool)
        .await?;
    Ok(id)
}

/// Newest snapshot, by position.
pub async fn latest_ladder(pool: &SqlitePool, limit: i64) -> Result<Vec<LadderEntryRow>> {
    let Some(snapshot) = latest_snapshot_id(pool).await? else {
        return Ok(Vec::new());
    };
    let rows = sqlx::query_as::<_, LadderEntryRow>(&format!(
        "SELECT {LADDER_COLUMNS} FROM ladder_entries WHERE last_updated = ? ORDER BY position LIMIT ?"
    ))
    .bind(snapshot)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// First team in the newest snapshot whose name contains `name`, ignoring case.
pub async fn team_position(pool: &SqlitePool, name: &str) -> Result<Option<LadderEntryRow>> {
    let Some(snapshot) = latest_snapshot_id(pool).await? else {
        return Ok(None);
    };
    let row = sqlx::query_as::<_, LadderEntryRow>(&format!(
        r#"
        SELECT {LADDER_COLUMNS} FROM ladder_entries
        WHERE last_updated = ? AND instr(lower(team_name), lower(?)) > 0
        ORDER BY position
        LIMIT 1
        "#
    ))
    .bind(snapshot)
    .bind(name.trim())
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
