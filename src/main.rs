mod api;
mod config;
mod db;
mod error;
mod fetcher;
mod pipeline;
mod reconcile;
mod scheduler;
mod scrape;
mod types;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::HtmlFetcher;
use crate::pipeline::Pipelines;
use crate::scheduler::Scheduler;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = db::connect(&cfg.db_path).await?;

    info!(
        "Scrape targets: ladder={} fixtures={} (session cookie: {})",
        cfg.ladder_url,
        cfg.fixtures_url,
        if cfg.session_cookie.is_some() { "set" } else { "none" },
    );

    // --- Pipelines ---
    let health = Arc::new(HealthState::new());
    let fetcher = HtmlFetcher::new()?;
    let pipelines = Arc::new(Pipelines::new(cfg.clone(), pool.clone(), fetcher, Arc::clone(&health)));

    // Weekly runs (background)
    let scheduler = Arc::new(Scheduler::from_config(&cfg));
    scheduler.spawn(Arc::clone(&pipelines));

    // HTTP API server
    let api_state = ApiState {
        pool,
        pipelines,
        health,
        scheduler,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
