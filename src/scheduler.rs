use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ImagesmithError, JobError};
use crate::executor::JobRunner;
use crate::job::JobDescriptor;
use crate::job_outcome::JobOutcome;
use crate::result_collector::{self, Report};
use crate::shutdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Dispatching,
    Awaiting,
    Aggregating,
    Done,
}

/// Drives the whole build matrix through a fixed number of worker slots.
///
/// One failing job never stops its siblings. Dispatch only stops early on
/// cancellation (shutdown signal, the config's token, or fail-fast), and even
/// then jobs already admitted run to completion.
pub struct Scheduler {
    config: Arc<Config>,
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    fn transition(&mut self, next: SchedulerState) {
        tracing::debug!(from = ?self.state, to = ?next, "Scheduler state changed");
        self.state = next;
    }

    pub async fn run(&mut self) -> Result<Report, ImagesmithError> {
        self.config.validate()?;
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let run_id = Uuid::new_v4();
        let started_at = chrono::Utc::now();
        let jobs = self.config.jobs();
        let concurrency = self.config.concurrency;
        let cancel_token = self.config.cancel_token.clone();

        tracing::info!(
            run_id = %run_id,
            jobs = jobs.len(),
            concurrency,
            output_dir = %self.config.output_dir.display(),
            "Starting build matrix"
        );

        let done = CancellationToken::new();
        let signal_watcher = tokio::spawn(shutdown::watch(
            self.config.shutdown_signals.clone(),
            cancel_token.clone(),
            done.clone(),
        ));

        let runner = JobRunner::from_config(&self.config);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let (result_tx, result_rx) = mpsc::channel::<JobOutcome>(concurrency);
        let collector = tokio::spawn(result_collector::run(
            result_rx,
            cancel_token.clone(),
            self.config.fail_fast,
        ));

        self.transition(SchedulerState::Dispatching);

        let mut workers = JoinSet::new();
        let mut not_started = Vec::new();

        for descriptor in jobs {
            if cancel_token.is_cancelled() {
                not_started.push(descriptor);
                continue;
            }

            // Blocks here while every slot is busy.
            let permit = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => Some(permit?),
            };
            let Some(permit) = permit else {
                not_started.push(descriptor);
                continue;
            };

            let runner = runner.clone();
            let result_tx = result_tx.clone();
            workers.spawn(async move {
                let outcome = run_guarded(&runner, descriptor).await;
                drop(permit);
                result_tx.send(outcome).await.ok();
            });
        }
        drop(result_tx);

        if !not_started.is_empty() {
            tracing::warn!(skipped = not_started.len(), "Dispatch stopped early");
        }

        self.transition(SchedulerState::Awaiting);

        while let Some(joined) = workers.join_next().await {
            joined?;
        }

        done.cancel();
        signal_watcher.await?;

        self.transition(SchedulerState::Aggregating);

        let mut collected = collector.await?;
        for descriptor in not_started {
            collected.record(JobOutcome::failed(descriptor, JobError::NotStarted));
        }
        let report = collected.into_report(run_id, started_at, chrono::Utc::now());

        self.transition(SchedulerState::Done);

        tracing::info!(
            run_id = %run_id,
            processed = report.stats.processed,
            succeeded = report.stats.succeeded,
            failed = report.stats.failed,
            "Build matrix finished"
        );

        Ok(report)
    }
}

async fn run_guarded(runner: &JobRunner, descriptor: JobDescriptor) -> JobOutcome {
    match AssertUnwindSafe(runner.run(descriptor.clone()))
        .catch_unwind()
        .await
    {
        Ok(outcome) => outcome,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(job = %descriptor, message, "Job panicked");
            JobOutcome::failed(descriptor, JobError::Panicked(message))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
