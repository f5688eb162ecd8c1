//! Cross-process run lock for scheduled jobs.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use domain::services::JobLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::WorkerError;

/// Wraps job bodies in a lease from a [`JobLock`].
///
/// One holder id per process. The lease is released after every run,
/// including failed ones; if the release itself fails the lease simply
/// expires after `ttl`.
#[derive(Clone)]
pub struct RunLock {
    lock: Arc<dyn JobLock>,
    holder: Uuid,
    ttl: Duration,
}

impl RunLock {
    pub fn new(lock: Arc<dyn JobLock>, ttl: Duration) -> Self {
        Self {
            lock,
            holder: Uuid::new_v4(),
            ttl,
        }
    }

    pub fn holder(&self) -> Uuid {
        self.holder
    }

    /// Runs `work` while holding the lease for `job`.
    ///
    /// Returns `Ok(None)` without polling `work` when another holder has it.
    pub async fn run<T, F>(&self, job: &str, work: F) -> Result<Option<T>, WorkerError>
    where
        F: Future<Output = Result<T, WorkerError>>,
    {
        if !self.lock.try_acquire(job, self.holder, self.ttl).await? {
            debug!(job, holder = %self.holder, "Run lock held elsewhere");
            return Ok(None);
        }

        let result = work.await;

        if let Err(e) = self.lock.release(job, self.holder).await {
            warn!(job, error = %e, "Failed to release run lock, lease will expire");
        }

        result.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::errors::StoreError;
    use domain::services::InMemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_runs_and_releases() {
        let store = Arc::new(InMemoryStore::new());
        let lock = RunLock::new(store.clone(), Duration::from_secs(60));

        let out = lock.run("sweep", async { Ok::<_, WorkerError>(7) }).await.unwrap();
        assert_eq!(out, Some(7));

        // Released, so a different holder can take it.
        assert!(store
            .try_acquire("sweep", Uuid::new_v4(), Duration::from_secs(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_skips_when_held_elsewhere() {
        let store = Arc::new(InMemoryStore::new());
        store
            .try_acquire("sweep", Uuid::new_v4(), Duration::from_secs(60))
            .await
            .unwrap();

        let ran = AtomicBool::new(false);
        let lock = RunLock::new(store, Duration::from_secs(60));
        let out = lock
            .run("sweep", async {
                ran.store(true, Ordering::SeqCst);
                Ok::<_, WorkerError>(())
            })
            .await
            .unwrap();
        assert!(out.is_none());
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_releases_after_failure() {
        let store = Arc::new(InMemoryStore::new());
        let lock = RunLock::new(store.clone(), Duration::from_secs(60));

        let result: Result<Option<()>, _> = lock
            .run("device_sync", async {
                Err(WorkerError::Store(StoreError::Database("boom".into())))
            })
            .await;
        assert!(matches!(result, Err(WorkerError::Store(_))));
        assert!(store
            .try_acquire("device_sync", Uuid::new_v4(), Duration::from_secs(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_jobs_are_locked_independently() {
        let store = Arc::new(InMemoryStore::new());
        store
            .try_acquire("device_sync", Uuid::new_v4(), Duration::from_secs(60))
            .await
            .unwrap();

        let lock = RunLock::new(store, Duration::from_secs(60));
        let out = lock.run("sweep", async { Ok::<_, WorkerError>(1) }).await;
        assert_eq!(out.unwrap(), Some(1));
    }
}
