//! Wires repositories, the vendor client and domain services into jobs.

use std::str::FromStr;
use std::sync::Arc;

use domain::services::{
    AlertLifecycleManager, Clock, DeviceGateway, DeviceSyncReconciler, StaticThresholds,
    SweepConfig, SweepOrchestrator, SystemClock, TenantInferenceEngine,
};
use persistence::repositories::{
    AlertRepository, DeviceRegistryRepository, JobLockRepository, PharmacyRepository,
    SensorAssignmentRepository,
};
use sqlx::PgPool;

use crate::config::Config;
use crate::error::WorkerError;
use crate::jobs::{DeviceSyncJob, JobScheduler, PoolMetricsJob, RunLock, SweepJob};
use crate::vendor::VendorClient;

/// What the binary was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the scheduler until interrupted.
    Run,
    /// One sweep, then exit.
    Sweep,
    /// One device sync, then exit.
    Sync,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "run" => Ok(Command::Run),
            "sweep" => Ok(Command::Sweep),
            "sync" | "device-sync" => Ok(Command::Sync),
            other => Err(format!(
                "Unknown command '{}', expected one of: run, sweep, sync",
                other
            )),
        }
    }
}

/// The two lock-guarded jobs, ready to run once or to be scheduled.
pub struct WorkerJobs {
    pub sweep: SweepJob,
    pub device_sync: DeviceSyncJob,
}

/// Builds both jobs over PostgreSQL and the live vendor API.
pub fn build_jobs(config: &Config, pool: &PgPool) -> Result<WorkerJobs, WorkerError> {
    let vendor: Arc<dyn DeviceGateway> = Arc::new(VendorClient::new(&config.vendor)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let alerts = Arc::new(AlertRepository::new(pool.clone()));
    let assignments = Arc::new(SensorAssignmentRepository::new(pool.clone()));
    let registry = Arc::new(DeviceRegistryRepository::new(pool.clone()));
    let tenants = Arc::new(PharmacyRepository::new(pool.clone()));
    let lock = RunLock::new(
        Arc::new(JobLockRepository::new(pool.clone())),
        config.jobs.lock_ttl(),
    );

    let orchestrator = SweepOrchestrator::new(
        assignments,
        AlertLifecycleManager::new(alerts, clock.clone()),
        vendor.clone(),
        registry.clone(),
        Arc::new(StaticThresholds::new()),
        clock.clone(),
        SweepConfig {
            reading_batch_size: config.vendor.reading_batch_size,
        },
    );

    let reconciler = DeviceSyncReconciler::new(
        vendor,
        registry,
        tenants,
        TenantInferenceEngine::new(config.inference.aliases.clone()),
        clock,
    );

    Ok(WorkerJobs {
        sweep: SweepJob::new(orchestrator, lock.clone(), config.jobs.sweep_interval_minutes),
        device_sync: DeviceSyncJob::new(reconciler, lock, config.jobs.sync_interval_minutes),
    })
}

/// Registers every periodic job. The scheduler is not started.
pub fn build_scheduler(config: &Config, pool: &PgPool, jobs: WorkerJobs) -> JobScheduler {
    let mut scheduler = JobScheduler::new();
    scheduler.register(jobs.sweep);
    scheduler.register(jobs.device_sync);
    scheduler.register(PoolMetricsJob::new(
        pool.clone(),
        config.jobs.pool_metrics_interval_secs,
    ));
    scheduler
}
