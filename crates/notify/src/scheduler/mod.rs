//! Recurring background sweeps.
//!
//! Each sweep is a [`RecurringJob`] driven by [`run_job`] on a
//! `tokio::time::interval` with [`MissedTickBehavior::Delay`]: an overrunning
//! sweep pushes the next tick back instead of bursting. Jobs stop when the
//! cancellation token fires, which is only observed between ticks. There is
//! no cross-instance lock, so two running instances may both send.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub mod cleanup;
pub mod confirmation;
pub mod pending;

pub use cleanup::LogCleanupSweep;
pub use confirmation::ConfirmationSweep;
pub use pending::PendingEventSweep;

/// Counters of one sweep execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Projects examined.
    pub projects: usize,
    /// Events triggered or re-processed.
    pub triggered: usize,
    /// Candidates skipped because a recent send already covered them.
    pub deduplicated: usize,
    /// Candidates with no phone or email to send to.
    pub unreachable: usize,
    /// Triggers that did not reach dispatch.
    pub failed: usize,
    pub errors: Vec<String>,
}

#[async_trait]
pub trait RecurringJob: Send + Sync {
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    /// One sweep across all tenants.
    async fn run_once(&self) -> SweepReport;
}

/// Run `job` every `job.interval()` until `cancel` fires. The first sweep
/// starts immediately.
pub async fn run_job(job: Arc<dyn RecurringJob>, cancel: CancellationToken) {
    let name = job.name();
    let period = job.interval();
    if period.is_zero() {
        tracing::error!(job = name, "Recurring job has a zero interval, not starting");
        return;
    }
    tracing::info!(job = name, interval_secs = period.as_secs(), "Recurring job started");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(job = name, "Recurring job stopping");
                break;
            }
            _ = interval.tick() => {
                let report = job.run_once().await;
                if report.errors.is_empty() {
                    tracing::debug!(
                        job = name,
                        projects = report.projects,
                        triggered = report.triggered,
                        deduplicated = report.deduplicated,
                        unreachable = report.unreachable,
                        "Sweep finished"
                    );
                } else {
                    tracing::warn!(
                        job = name,
                        projects = report.projects,
                        triggered = report.triggered,
                        failed = report.failed,
                        errors = ?report.errors,
                        "Sweep finished with errors"
                    );
                }
            }
        }
    }
}

/// Spawn one task per job.
pub fn spawn_all(jobs: Vec<Arc<dyn RecurringJob>>, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
    jobs.into_iter()
        .map(|job| tokio::spawn(run_job(job, cancel.clone())))
        .collect()
}
