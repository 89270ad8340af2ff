use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::health::{HealthState, PipelineHealthView};
use crate::config::{DEFAULT_LIST_LIMIT, STATUS_LOOKAHEAD_GAMES};
use crate::db;
use crate::db::models::{GameRow, LadderEntryRow};
use crate::error::AppError;
use crate::pipeline::Pipelines;
use crate::scheduler::{Scheduler, SchedulerStatus};
use crate::types::{Pipeline, RunSummary};

#[derive(Clone)]
pub struct ApiState {
    pub pool: sqlx::SqlitePool,
    pub pipelines: Arc<Pipelines>,
    pub health: Arc<HealthState>,
    pub scheduler: Arc<Scheduler>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/ladder", get(get_ladder))
        .route("/ladder/team/:name", get(get_team))
        .route("/ladder/update", post(post_ladder_update))
        .route("/fixtures", get(get_fixtures))
        .route("/fixtures/status", get(get_fixtures_status))
        .route("/fixtures/update", post(post_fixtures_update))
        .route("/schedule/status", get(get_schedule_status))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

impl LimitQuery {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).max(1)
    }
}

#[derive(Deserialize)]
pub struct UpdateQuery {
    /// Scrape this page instead of the configured default.
    pub url: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct PipelineHealthResponse {
    #[serde(flatten)]
    pub health: PipelineHealthView,
    pub running: bool,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub scheduler_running: bool,
    pub ladder: PipelineHealthResponse,
    pub fixtures: PipelineHealthResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureView {
    pub id: i64,
    pub opponent_name: String,
    pub date: NaiveDate,
    pub datetime: NaiveDateTime,
    pub venue: Option<String>,
    pub is_today: bool,
    pub days_until: i64,
    pub has_scores: bool,
}

impl FixtureView {
    pub fn from_game(game: &GameRow, today: NaiveDate) -> Self {
        let date = game.scheduled_at.date();
        let days_until = (date - today).num_days();
        Self {
            id: game.id,
            opponent_name: game.opponent_name.clone(),
            date,
            datetime: game.scheduled_at,
            venue: game.venue.clone(),
            is_today: days_until == 0,
            days_until,
            has_scores: game.has_scores(),
        }
    }
}

#[derive(Serialize)]
pub struct FixturesResponse {
    pub fixtures: Vec<FixtureView>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixturesStatus {
    pub upcoming_count: usize,
    pub today_count: usize,
    pub this_week_count: usize,
    pub last_checked: DateTime<Utc>,
}

impl FixturesStatus {
    pub fn from_games(games: &[GameRow], today: NaiveDate, now: DateTime<Utc>) -> Self {
        let views: Vec<_> = games.iter().map(|g| FixtureView::from_game(g, today)).collect();
        Self {
            upcoming_count: views.len(),
            today_count: views.iter().filter(|v| v.is_today).count(),
            this_week_count: views.iter().filter(|v| v.days_until <= 7).count(),
            last_checked: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn pipeline_health(state: &ApiState, p: Pipeline) -> PipelineHealthResponse {
    PipelineHealthResponse {
        health: state.health.pipeline(p).snapshot(),
        running: state.pipelines.locks().is_held(p.lock_name()),
    }
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        scheduler_running: state.scheduler.enabled(),
        ladder: pipeline_health(&state, Pipeline::Ladder),
        fixtures: pipeline_health(&state, Pipeline::Fixtures),
    })
}

async fn get_ladder(
    State(state): State<ApiState>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<LadderEntryRow>>, AppError> {
    let rows = db::ladder::latest_ladder(&state.pool, params.limit()).await?;
    Ok(Json(rows))
}

async fn get_team(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<LadderEntryRow>, AppError> {
    db::ladder::team_position(&state.pool, &name)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("team '{name}' not in the latest ladder")))
}

async fn post_ladder_update(
    State(state): State<ApiState>,
    Query(params): Query<UpdateQuery>,
) -> Json<RunSummary> {
    Json(state.pipelines.run_ladder(params.url.as_deref()).await)
}

async fn get_fixtures(
    State(state): State<ApiState>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<FixturesResponse>, AppError> {
    let today = Local::now().date_naive();
    let games = db::games::upcoming_games(&state.pool, today, params.limit()).await?;
    let fixtures: Vec<_> = games.iter().map(|g| FixtureView::from_game(g, today)).collect();
    Ok(Json(FixturesResponse { count: fixtures.len(), fixtures }))
}

async fn get_fixtures_status(
    State(state): State<ApiState>,
) -> Result<Json<FixturesStatus>, AppError> {
    let today = Local::now().date_naive();
    let games = db::games::upcoming_games(&state.pool, today, STATUS_LOOKAHEAD_GAMES).await?;
    Ok(Json(FixturesStatus::from_games(&games, today, Utc::now())))
}

async fn post_fixtures_update(
    State(state): State<ApiState>,
    Query(params): Query<UpdateQuery>,
) -> Json<RunSummary> {
    Json(state.pipelines.run_fixtures(params.url.as_deref()).await)
}

async fn get_schedule_status(State(state): State<ApiState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status(Utc::now()))
}
