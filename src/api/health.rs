//! Shared health state for the /health endpoint.
//! Updated by the pipeline driver after every run, read by the API.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

use crate::types::{Pipeline, RunSummary};

/// Per-pipeline run bookkeeping.
#[derive(Default)]
pub struct PipelineHealth {
    /// Nanosecond timestamp of the last finished run (0 = never ran).
    last_run_at_ns: AtomicU64,
    last_success: AtomicBool,
    runs: AtomicU64,
    failures: AtomicU64,
}

impl PipelineHealth {
    fn record(&self, summary: &RunSummary) {
        let finished_ns = summary
            .finished_at
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .max(0) as u64;
        self.last_run_at_ns.store(finished_ns, Ordering::Relaxed);
        self.last_success.store(summary.success, Ordering::Relaxed);
        self.runs.fetch_add(1, Ordering::Relaxed);
        if !summary.success {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn last_run_at_ns(&self) -> u64 {
        self.last_run_at_ns.load(Ordering::Relaxed)
    }

    pub fn last_success(&self) -> bool {
        self.last_success.load(Ordering::Relaxed)
    }

    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> PipelineHealthView {
        let last = self.last_run_at_ns();
        PipelineHealthView {
            last_run_at_ns: (last > 0).then_some(last),
            last_success: (last > 0).then(|| self.last_success()),
            runs: self.runs(),
            failures: self.failures(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineHealthView {
    pub last_run_at_ns: Option<u64>,
    pub last_success: Option<bool>,
    pub runs: u64,
    pub failures: u64,
}

#[derive(Default)]
pub struct HealthState {
    pub ladder: PipelineHealth,
    pub fixtures: PipelineHealth,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pipeline(&self, p: Pipeline) -> &PipelineHealth {
        match p {
            Pipeline::Ladder => &self.ladder,
            Pipeline::Fixtures => &self.fixtures,
        }
    }

    pub fn record(&self, summary: &RunSummary) {
        self.pipeline(summary.pipeline).record(summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunCounts;
    use chrono::Utc;

    #[test]
    fn never_run_reports_nothing() {
        let h = HealthState::new();
        let view = h.ladder.snapshot();
        assert_eq!(view.last_run_at_ns, None);
        assert_eq!(view.last_success, None);
        assert_eq!(view.runs, 0);
    }

    #[test]
    fn records_land_on_their_pipeline() {
        let h = HealthState::new();
        h.record(&RunSummary::failed(Pipeline::Fixtures, "down", Utc::now()));
        h.record(&RunSummary::completed(Pipeline::Fixtures, "ok", RunCounts::default(), Utc::now()));

        assert_eq!(h.fixtures.runs(), 2);
        assert_eq!(h.fixtures.failures(), 1);
        assert!(h.fixtures.last_success());
        assert!(h.fixtures.last_run_at_ns() > 0);
        assert_eq!(h.ladder.runs(), 0);
    }
}
