//! Database metrics.
//!
//! Repositories time each query with [`QueryTimer`]; the worker samples pool
//! usage after every job run.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

pub fn record_query_duration(query_name: &'static str, duration_secs: f64) {
    histogram!("database_query_duration_seconds", "query" => query_name).record(duration_secs);
}

/// Record connection pool gauges.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("database_connections_active").set(size.saturating_sub(idle) as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Times one query and records the elapsed seconds on [`QueryTimer::record`].
///
/// ```ignore
/// let timer = QueryTimer::new("open_alerts_for_sensor");
/// let result = sqlx::query_as::<_, AlertEntity>(...).fetch_all(&pool).await;
/// timer.record();
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    pub fn record(self) {
        record_query_duration(self.query_name, self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_timer_keeps_name() {
        let timer = QueryTimer::new("list_active_assignments");
        assert_eq!(timer.query_name, "list_active_assignments");
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        QueryTimer::new("find_alert").record();
    }
}
