//! Daily log-retention sweep.
//!
//! Computes the retention cutoff and reports it. Log rows are not deleted
//! yet.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use super::{RecurringJob, SweepReport};

pub struct LogCleanupSweep {
    retention_days: i64,
    interval: Duration,
}

impl LogCleanupSweep {
    pub fn new(retention_days: i64, interval: Duration) -> Self {
        Self {
            retention_days,
            interval,
        }
    }

    /// Logs created before this instant are past retention. Saturates at
    /// the earliest representable instant.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::try_days(self.retention_days)
            .and_then(|retention| now.checked_sub_signed(retention))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[async_trait]
impl RecurringJob for LogCleanupSweep {
    fn name(&self) -> &'static str {
        "log_cleanup"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run_once(&self) -> SweepReport {
        let cutoff = self.cutoff(Utc::now());
        // TODO: delete notification_logs rows older than the cutoff once
        // the retention policy is agreed with the restaurant operators.
        tracing::info!(
            retention_days = self.retention_days,
            %cutoff,
            "Log cleanup: rows older than cutoff are eligible for removal"
        );
        SweepReport::default()
    }
}
