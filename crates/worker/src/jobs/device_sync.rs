//! Scheduled vendor device sync.

use domain::services::{DeviceSyncReconciler, SyncSummary};
use tracing::info;

use super::run_lock::RunLock;
use super::scheduler::{Job, JobFrequency, JobRun};
use crate::error::WorkerError;
use crate::metrics::record_sync;

/// Mirrors the vendor gateway and sensor inventory into the local registry.
pub struct DeviceSyncJob {
    reconciler: DeviceSyncReconciler,
    lock: RunLock,
    interval_minutes: u64,
}

impl DeviceSyncJob {
    pub const NAME: &'static str = "device_sync";

    pub fn new(reconciler: DeviceSyncReconciler, lock: RunLock, interval_minutes: u64) -> Self {
        Self {
            reconciler,
            lock,
            interval_minutes,
        }
    }

    pub async fn run_once(&self) -> Result<Option<SyncSummary>, WorkerError> {
        let summary = self
            .lock
            .run(Self::NAME, async {
                Ok::<_, WorkerError>(self.reconciler.sync().await?)
            })
            .await?;

        if let Some(summary) = &summary {
            record_sync(summary);
            info!(
                created = summary.created(),
                updated = summary.updated(),
                issues = summary.issues.len(),
                "Device sync finished"
            );
        }
        Ok(summary)
    }
}

#[async_trait::async_trait]
impl Job for DeviceSyncJob {
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
