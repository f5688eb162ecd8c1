//! Scheduled cold-chain sweep.

use domain::services::{SweepOrchestrator, SweepSummary};
use tracing::info;

use super::run_lock::RunLock;
use super::scheduler::{Job, JobFrequency, JobRun};
use crate::error::WorkerError;
use crate::metrics::record_sweep;

/// Evaluates every active sensor assignment on a fixed interval.
pub struct SweepJob {
    orchestrator: SweepOrchestrator,
    lock: RunLock,
    interval_minutes: u64,
}

impl SweepJob {
    pub const NAME: &'static str = "cold_chain_sweep";

    pub fn new(orchestrator: SweepOrchestrator, lock: RunLock, interval_minutes: u64) -> Self {
        Self {
            orchestrator,
            lock,
            interval_minutes,
        }
    }

    /// Runs one sweep under the run lock. `None` means another worker holds it.
    pub async fn run_once(&self) -> Result<Option<SweepSummary>, WorkerError> {
        let summary = self
            .lock
            .run(Self::NAME, async {
                Ok::<_, WorkerError>(self.orchestrator.run_sweep().await?)
            })
            .await?;

        if let Some(summary) = &summary {
            record_sweep(summary);
            info!(
                evaluated = summary.evaluated,
                offline = summary.offline,
                alerts_created = summary.alerts_created,
                alerts_resolved = summary.alerts_resolved,
                issues = summary.issues.len(),
                "Sweep finished"
            );
        }
        Ok(summary)
    }
}

#[async_trait::async_trait]
impl Job for SweepJob {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.interval_minutes)
    }

    async fn execute(&self) -> Result<JobRun, String> {
        match self.run_once().await {
            Ok(Some(_)) => Ok(JobRun::Completed),
            Ok(None) => Ok(JobRun::Skipped),
            Err(e) => Err(e.to_string()),
        }
    }
}
