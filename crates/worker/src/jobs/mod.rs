//! Background job scheduler and job implementations.

mod device_sync;
mod pool_metrics;
mod run_lock;
mod scheduler;
mod sweep;

pub use device_sync::DeviceSyncJob;
pub use pool_metrics::PoolMetricsJob;
pub use run_lock::RunLock;
pub use scheduler::{run_job, Job, JobFrequency, JobRun, JobScheduler};
pub use sweep::SweepJob;
