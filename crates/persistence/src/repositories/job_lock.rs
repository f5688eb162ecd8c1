//! Lease-based job lock repository.

use std::time::Duration;

use async_trait::async_trait;
use domain::errors::StoreError;
use domain::services::JobLock;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::map_sqlx_error;
use crate::metrics::QueryTimer;

/// Repository for the job_locks table.
///
/// A lease is taken when the row is missing, expired, or already held by the
/// same holder (renewal).
#[derive(Clone)]
pub struct JobLockRepository {
    pool: PgPool,
}

impl JobLockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobLock for JobLockRepository {
    async fn try_acquire(&self, job: &str, holder: Uuid, ttl: Duration) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("try_acquire_job_lock");
        let result: Result<Option<(Uuid,)>, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO job_locks (job_name, holder, acquired_at, expires_at)
            VALUES ($1, $2, NOW(), NOW() + make_interval(secs => $3))
            ON CONFLICT (job_name) DO UPDATE
            SET holder = EXCLUDED.holder,
                acquired_at = EXCLUDED.acquired_at,
                expires_at = EXCLUDED.expires_at
            WHERE job_locks.expires_at < NOW() OR job_locks.holder = EXCLUDED.holder
            RETURNING holder
            "#,
        )
        .bind(job)
        .bind(holder)
        .bind(ttl.as_secs_f64())
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_sqlx_error)?.is_some())
    }

    async fn release(&self, job: &str, holder: Uuid) -> Result<(), StoreError> {
        let timer = QueryTimer::new("release_job_lock");
        let result = sqlx::query(
            r#"
            DELETE FROM job_locks
            WHERE job_name = $1 AND holder = $2
            "#,
        )
        .bind(job)
        .bind(holder)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map_err(map_sqlx_error)?;
        Ok(())
    }
}
