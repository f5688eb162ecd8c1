//! Alert repository implementation.
//!
//! The partial unique index on `(sensor_id, alert_type) WHERE resolved = false`
//! turns a racing duplicate insert into `StoreError::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::errors::StoreError;
use domain::models::{Alert, NewAlert, ResolveAlert};
use domain::services::AlertStore;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{AlertEntity, AlertSeverityDb, AlertTypeDb};
use crate::error::map_sqlx_error;
use crate::metrics::QueryTimer;

/// Repository for alert database operations.
#[derive(Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertStore for AlertRepository {
    async fn open_alerts_for_sensor(&self, sensor_id: &str) -> Result<Vec<Alert>, StoreError> {
        let timer = QueryTimer::new("open_alerts_for_sensor");
        let result = sqlx::query_as::<_, AlertEntity>(
            r#"
            SELECT * FROM alerts
            WHERE sensor_id = $1 AND resolved = FALSE
            ORDER BY created_at DESC
            "#,
        )
        .bind(sensor_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result
            .map_err(map_sqlx_error)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn create_alert(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        let timer = QueryTimer::new("create_alert");
        let result = sqlx::query_as::<_, AlertEntity>(
            r#"
            INSERT INTO alerts (
                id, sensor_id, pharmacy_id, alert_type, severity,
                current_value, threshold_value, message, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&alert.sensor_id)
        .bind(alert.pharmacy_id)
        .bind(AlertTypeDb::from(alert.alert_type))
        .bind(AlertSeverityDb::from(alert.severity))
        .bind(alert.current_value)
        .bind(alert.threshold_value)
        .bind(&alert.message)
        .bind(alert.created_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_sqlx_error)?.into())
    }

    async fn refresh_alert(
        &self,
        id: Uuid,
        current_value: f64,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError> {
        let timer = QueryTimer::new("refresh_alert");
        let result = sqlx::query_as::<_, AlertEntity>(
            r#"
            UPDATE alerts
            SET current_value = $2, message = $3, updated_at = $4
            WHERE id = $1 AND resolved = FALSE
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(current_value)
        .bind(message)
        .bind(at)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
            .map_err(map_sqlx_error)?
            .map(Into::into)
            .ok_or_else(|| StoreError::NotFound(format!("Open alert {}", id)))
    }

    async fn resolve_alert(&self, id: Uuid, resolution: ResolveAlert) -> Result<Alert, StoreError> {
        let timer = QueryTimer::new("resolve_alert");
        let result = sqlx::query_as::<_, AlertEntity>(
            r#"
            UPDATE alerts
            SET resolved = TRUE,
                resolved_at = $2,
                resolved_by = $3,
                resolved_note = $4,
                updated_at = $2
            WHERE id = $1 AND resolved = FALSE
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(resolution.resolved_at)
        .bind(resolution.resolved_by)
        .bind(&resolution.note)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        match result.map_err(map_sqlx_error)? {
            Some(entity) => Ok(entity.into()),
            // Already resolved rows are returned unchanged.
            None => self
                .find_alert(id)
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("Alert {}", id))),
        }
    }

    async fn find_alert(&self, id: Uuid) -> Result<Option<Alert>, StoreError> {
        let timer = QueryTimer::new("find_alert");
        let result = sqlx::query_as::<_, AlertEntity>(
            r#"
            SELECT * FROM alerts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_sqlx_error)?.map(Into::into))
    }

    async fn list_open_alerts(&self, pharmacy_id: Option<Uuid>) -> Result<Vec<Alert>, StoreError> {
        let timer = QueryTimer::new("list_open_alerts");
        let result = sqlx::query_as::<_, AlertEntity>(
            r#"
            SELECT * FROM alerts
            WHERE resolved = FALSE
              AND ($1::uuid IS NULL OR pharmacy_id = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(pharmacy_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result
            .map_err(map_sqlx_error)?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}
