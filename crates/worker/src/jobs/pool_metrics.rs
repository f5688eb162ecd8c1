//! Background job to record connection pool metrics.

use sqlx::PgPool;

use super::scheduler::{Job, JobFrequency, JobRun};

/// Periodically publishes database connection pool gauges.
pub struct PoolMetricsJob {
    pool: PgPool,
    interval_secs: u64,
}

impl PoolMetricsJob {
    pub fn new(pool: PgPool, interval_secs: u64) -> Self {
        Self {
            pool,
            interval_secs: interval_secs.max(1),
        }
    }
}

#[async_trait::async_trait]
impl Job for PoolMetricsJob {
    fn name(&self) -> &'static str {
        "pool_metrics"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    async fn execute(&self) -> Result<JobRun, String> {
        persistence::metrics::record_pool_metrics(&self.pool);
        Ok(JobRun::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn test_frequency_is_clamped() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/coldchain")
            .unwrap();
        let job = PoolMetricsJob::new(pool, 0);
        assert_eq!(job.frequency(), JobFrequency::Seconds(1));
        assert_eq!(job.execute().await, Ok(JobRun::Completed));
    }
}
