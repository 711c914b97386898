use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::ImagesmithError;
use crate::job_outcome::{JobOutcome, JobSummary};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub warnings: u64,
}

#[derive(Default, Debug)]
pub struct Collected {
    pub stats: Stats,
    pub outcomes: Vec<JobOutcome>,
}

impl Collected {
    pub fn record(&mut self, outcome: JobOutcome) {
        self.stats.processed += 1;
        if outcome.success() {
            self.stats.succeeded += 1;
        } else {
            self.stats.failed += 1;
        }
        self.stats.warnings += outcome.warnings.len() as u64;
        self.outcomes.push(outcome);
    }

    pub fn into_report(
        self,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Report {
        Report {
            run_id,
            started_at,
            finished_at,
            stats: self.stats,
            outcomes: self.outcomes,
        }
    }
}

/// Drains outcomes until every sender is gone. Cancellation does not stop the
/// collector: jobs still in flight must be accounted for.
pub async fn run(
    mut rx: mpsc::Receiver<JobOutcome>,
    cancel_token: CancellationToken,
    fail_fast: bool,
) -> Collected {
    let mut collected = Collected::default();

    while let Some(outcome) = rx.recv().await {
        match &outcome.error {
            None => tracing::info!(
                job = %outcome.descriptor,
                artifact = ?outcome.artifact,
                "Image built"
            ),
            Some(e) => tracing::error!(job = %outcome.descriptor, error = %e, "Image build failed"),
        }

        if fail_fast && !outcome.success() && !cancel_token.is_cancelled() {
            tracing::warn!(job = %outcome.descriptor, "Failing fast, no further jobs will start");
            cancel_token.cancel();
        }

        collected.record(outcome);
    }

    collected
}

#[derive(Debug)]
pub struct Report {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stats: Stats,
    pub outcomes: Vec<JobOutcome>,
}

#[derive(Debug, Serialize)]
struct ReportSummary {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    stats: Stats,
    jobs: Vec<JobSummary>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.stats.failed == 0
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.success())
    }

    pub fn to_json(&self) -> Result<String, ImagesmithError> {
        let summary = ReportSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: self.finished_at,
            stats: self.stats,
            jobs: self.outcomes.iter().map(JobOutcome::summary).collect(),
        };
        Ok(serde_json::to_string_pretty(&summary)?)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = (self.finished_at - self.started_at).num_seconds();
        writeln!(
            f,
            "Built {} of {} images in {}s (run {})",
            self.stats.succeeded, self.stats.processed, elapsed, self.run_id
        )?;

        for outcome in self.succeeded() {
            if let Some(path) = &outcome.artifact {
                writeln!(f, "  ok   {}: {}", outcome.descriptor, path.display())?;
            }
            for warning in &outcome.warnings {
                writeln!(f, "  warn {}: {}", outcome.descriptor, warning)?;
            }
        }

        for outcome in self.failed() {
            if let Some(e) = &outcome.error {
                writeln!(f, "  FAIL {}: {}", outcome.descriptor, e)?;
            }
        }

        Ok(())
    }
}
