//! Prometheus exporter and job counters.

use domain::services::{SweepSummary, SyncSummary};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::error::WorkerError;

/// Installs the global recorder and serves `/metrics` on `addr`.
///
/// Must be called from within a tokio runtime, once, before any metric is
/// recorded.
pub fn init_metrics(addr: SocketAddr) -> Result<(), WorkerError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(&[0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0])
        .map_err(|e| WorkerError::Metrics(e.to_string()))?
        .install()
        .map_err(|e| WorkerError::Metrics(e.to_string()))
}

pub fn record_sweep(summary: &SweepSummary) {
    counter!("sweep_alerts_created_total").increment(summary.alerts_created as u64);
    counter!("sweep_alerts_resolved_total").increment(summary.alerts_resolved as u64);
    counter!("sweep_issues_total").increment(summary.issues.len() as u64);
    gauge!("sweep_sensors_evaluated").set(summary.evaluated as f64);
    gauge!("sweep_sensors_offline").set(summary.offline as f64);
}

pub fn record_sync(summary: &SyncSummary) {
    counter!("device_sync_created_total").increment(summary.created() as u64);
    counter!("device_sync_issues_total").increment(summary.issues.len() as u64);
}

/// Job run outcome: `ok`, `failed` or `skipped` (lock held elsewhere).
pub fn record_job_run(job: &'static str, outcome: &'static str, duration_secs: f64) {
    counter!("job_runs_total", "job" => job, "outcome" => outcome).increment(1);
    histogram!("job_duration_seconds", "job" => job).record(duration_secs);
}
