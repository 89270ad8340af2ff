//! Fetch → extract → parse → reconcile → commit, once per trigger.
//!
//! A run never propagates an error: whatever goes wrong comes back as a
//! `RunSummary` with `success: false`, because the timer that drives this has
//! nobody to hand an error to.

pub mod locks;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::api::health::HealthState;
use crate::config::Config;
use crate::db;
use crate::error::Result;
use crate::fetcher::HtmlFetcher;
use crate::scrape::{parse_fixtures_page, parse_ladder_page};
use crate::types::{Pipeline, RunCounts, RunSummary};

pub use locks::RunLocks;

pub struct Pipelines {
    cfg: Config,
    pool: sqlx::SqlitePool,
    fetcher: HtmlFetcher,
    locks: RunLocks,
    health: Arc<HealthState>,
}

impl Pipelines {
    pub fn new(
        cfg: Config,
        pool: sqlx::SqlitePool,
        fetcher: HtmlFetcher,
        health: Arc<HealthState>,
    ) -> Self {
        Self { cfg, pool, fetcher, locks: RunLocks::new(), health }
    }

    pub fn locks(&self) -> &RunLocks {
        &self.locks
    }

    pub fn default_url(&self, pipeline: Pipeline) -> &str {
        match pipeline {
            Pipeline::Ladder => &self.cfg.ladder_url,
            Pipeline::Fixtures => &self.cfg.fixtures_url,
        }
    }

    pub async fn run_ladder(&self, url: Option<&str>) -> RunSummary {
        self.run(Pipeline::Ladder, url).await
    }

    pub async fn run_fixtures(&self, url: Option<&str>) -> RunSummary {
        self.run(Pipeline::Fixtures, url).await
    }

    /// Run one pipeline end to end. `url` overrides the configured target.
    /// Returns immediately with a failure if the same pipeline is already running.
    pub async fn run(&self, pipeline: Pipeline, url: Option<&str>) -> RunSummary {
        let started_at = Utc::now();

        let Some(_guard) = self.locks.try_acquire(pipeline.lock_name()) else {
            warn!(pipeline = %pipeline, "{pipeline} update already running; not starting another");
            return RunSummary::failed(pipeline, format!("{pipeline} update already running"), started_at);
        };

        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.default_url(pipeline));
        info!(pipeline = %pipeline, url = %url, "Starting {pipeline} update");

        let result = match pipeline {
            Pipeline::Ladder => self.update_ladder(url, started_at).await,
            Pipeline::Fixtures => self.update_fixtures(url, started_at).await,
        };

        let summary = match result {
            Ok(s) => s,
            Err(e) => {
                error!(pipeline = %pipeline, "Error updating {pipeline}: {e}");
                RunSummary::failed(pipeline, format!("Error updating {pipeline}: {e}"), started_at)
            }
        };

        if summary.success {
            let c = summary.counts();
            info!(
                pipeline = %pipeline,
                created = c.created,
                updated = c.updated,
                skipped = c.skipped,
                total = c.total,
                "{pipeline} update complete: {}",
                summary.message,
            );
        }
        self.health.record(&summary);
        summary
    }

    async fn update_ladder(&self, url: &str, started_at: DateTime<Utc>) -> Result<RunSummary> {
        let html = self.fetcher.fetch(url, self.cfg.session_cookie.as_deref()).await?;
        let page = parse_ladder_page(&html);

        if page.rows.is_empty() {
            warn!("No ladder data received from scraper");
            return Ok(RunSummary::completed(
                Pipeline::Ladder,
                "No ladder data found",
                RunCounts::default(),
                started_at,
            ));
        }

        let mut tx = self.pool.begin().await?;
        let write = db::ladder::replace_snapshot(&mut tx, &page.rows, Utc::now()).await?;
        tx.commit().await?;

        let counts = RunCounts {
            created: write.inserted,
            updated: 0,
            skipped: 0,
            total: write.inserted,
        };
        let message = format!(
            "Updated ladder with {} teams (division: {}, {} same-day rows replaced)",
            write.inserted,
            page.division.as_deref().unwrap_or("unknown"),
            write.replaced,
        );
        Ok(RunSummary::completed(Pipeline::Ladder, message, counts, started_at))
    }

    async fn update_fixtures(&self, url: &str, started_at: DateTime<Utc>) -> Result<RunSummary> {
        let html = self.fetcher.fetch(url, self.cfg.session_cookie.as_deref()).await?;
        let fixtures = parse_fixtures_page(&html);

        if fixtures.is_empty() {
            warn!("No fixtures data received from scraper");
            return Ok(RunSummary::completed(
                Pipeline::Fixtures,
                "No fixtures data found",
                RunCounts::default(),
                started_at,
            ));
        }

        let mut tx = self.pool.begin().await?;
        let counts = db::games::reconcile_fixtures(&mut tx, &fixtures).await;
        tx.commit().await?;

        let message = format!("Successfully processed {} fixtures", fixtures.len());
        Ok(RunSummary::completed(Pipeline::Fixtures, message, counts, started_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_pool;

    const LADDER_HTML: &str = r#"
        <select id="grade"><option selected>Div 2</option></select>
        <table>
          <tr><th>Team</th><th>W</th><th>D</th><th>L</th><th>%</th><th>PF</th><th>PA</th></tr>
          <tr><td>Eagles</td><td>10</td><td>2</td><td>3</td><td>66.7%</td><td>450</td><td>380</td></tr>
          <tr><td>Hawks</td><td>5</td><td>0</td><td>10</td><td>33.3%</td><td>390</td><td>420</td></tr>
        </table>"#;

    const FIXTURES_HTML: &str = r#"
        <table>
          <tr><th>Time &amp; Venue</th><th>Versus</th></tr>
          <tr><td>15/06/2025 7:30pm Main Stadium</td><td>Eagles</td></tr>
          <tr><td>22/06/2025 Arena</td><td>Hawks</td></tr>
        </table>"#;

    async fn setup(server: &mockito::ServerGuard) -> (Pipelines, sqlx::SqlitePool, Arc<HealthState>) {
        let pool = memory_pool().await;
        let health = Arc::new(HealthState::new());
        let pipelines = Pipelines::new(
            Config::for_tests(&server.url()),
            pool.clone(),
            HtmlFetcher::new().unwrap(),
            Arc::clone(&health),
        );
        (pipelines, pool, health)
    }

    #[tokio::test]
    async fn fixtures_run_is_idempotent() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/fixtures")
            .with_status(200)
            .with_body(FIXTURES_HTML)
            .expect(2)
            .create_async()
            .await;
        let (pipelines, _pool, _health) = setup(&server).await;

        let first = pipelines.run_fixtures(None).await;
        assert!(first.success, "{}", first.message);
        // Hawks has no time, so it is skipped rather than defaulted.
        assert_eq!((first.created, first.updated, first.skipped, first.total), (1, 0, 1, 2));

        let second = pipelines.run_fixtures(None).await;
        assert!(second.success);
        assert_eq!((second.created, second.updated, second.skipped), (0, 0, 2));
    }

    #[tokio::test]
    async fn ladder_run_writes_snapshot() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/ladder")
            .with_status(200)
            .with_body(LADDER_HTML)
            .create_async()
            .await;
        let (pipelines, pool, health) = setup(&server).await;

        let s = pipelines.run_ladder(None).await;
        assert!(s.success, "{}", s.message);
        assert_eq!((s.created, s.total), (2, 2));
        assert!(s.message.contains("Div 2"));

        let ladder = db::ladder::latest_ladder(&pool, 10).await.unwrap();
        assert_eq!(ladder.len(), 2);
        assert_eq!(ladder[0].team_name, "Eagles");
        assert_eq!(ladder[0].games_played, 15);
        assert!(health.ladder.last_success());
    }

    #[tokio::test]
    async fn override_url_is_used() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/other-grade")
            .with_status(200)
            .with_body(LADDER_HTML)
            .create_async()
            .await;
        let (pipelines, _pool, _health) = setup(&server).await;

        let url = format!("{}/other-grade", server.url());
        let s = pipelines.run_ladder(Some(&url)).await;
        assert!(s.success);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn page_without_tables_is_an_empty_success() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body("<html><body>Nothing scheduled</body></html>")
            .create_async()
            .await;
        let (pipelines, _pool, _health) = setup(&server).await;

        for s in [pipelines.run_ladder(None).await, pipelines.run_fixtures(None).await] {
            assert!(s.success);
            assert_eq!((s.created, s.updated, s.skipped, s.total), (0, 0, 0, 0));
        }
    }

    #[tokio::test]
    async fn empty_ladder_page_keeps_todays_snapshot() {
        let mut server = mockito::Server::new_async().await;
        let _full = server
            .mock("GET", "/ladder")
            .with_status(200)
            .with_body(LADDER_HTML)
            .create_async()
            .await;
        let _empty = server
            .mock("GET", "/empty")
            .with_status(200)
            .with_body("<p>maintenance</p>")
            .create_async()
            .await;
        let (pipelines, pool, _health) = setup(&server).await;

        assert!(pipelines.run_ladder(None).await.success);
        let empty_url = format!("{}/empty", server.url());
        assert!(pipelines.run_ladder(Some(&empty_url)).await.success);

        assert_eq!(db::ladder::latest_ladder(&pool, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_is_reported_not_raised() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/fixtures")
            .with_status(500)
            .create_async()
            .await;
        let (pipelines, _pool, health) = setup(&server).await;

        let s = pipelines.run_fixtures(None).await;
        assert!(!s.success);
        assert!(s.message.starts_with("Error updating fixtures"));
        assert_eq!((s.created, s.updated, s.skipped, s.total), (0, 0, 0, 0));
        assert_eq!(health.fixtures.failures(), 1);
    }

    #[tokio::test]
    async fn concurrent_run_of_same_pipeline_is_refused() {
        let server = mockito::Server::new_async().await;
        let (pipelines, _pool, _health) = setup(&server).await;

        let _held = pipelines.locks().try_acquire(Pipeline::Ladder.lock_name()).unwrap();
        let s = pipelines.run_ladder(None).await;
        assert!(!s.success);
        assert!(s.message.contains("already running"));
    }
}
