//! Sensor assignment repository implementation.

use async_trait::async_trait;
use domain::errors::StoreError;
use domain::models::{CreateSensorAssignmentRequest, SensorAssignment, UpdateSensorAssignmentRequest};
use domain::services::AssignmentStore;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{LocationCategoryDb, SensorAssignmentEntity};
use crate::error::map_sqlx_error;
use crate::metrics::QueryTimer;

/// Repository for sensor assignment database operations.
#[derive(Clone)]
pub struct SensorAssignmentRepository {
    pool: PgPool,
}

impl SensorAssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active assignments for one pharmacy, by label.
    pub async fn list_for_pharmacy(
        &self,
        pharmacy_id: Uuid,
    ) -> Result<Vec<SensorAssignment>, StoreError> {
        let timer = QueryTimer::new("list_assignments_for_pharmacy");
        let result = sqlx::query_as::<_, SensorAssignmentEntity>(
            r#"
            SELECT * FROM sensor_assignments
            WHERE pharmacy_id = $1 AND is_active = TRUE
            ORDER BY label NULLS LAST, sensor_id
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

#[async_trait]
impl AssignmentStore for SensorAssignmentRepository {
    async fn list_active_assignments(&self) -> Result<Vec<SensorAssignment>, StoreError> {
        let timer = QueryTimer::new("list_active_assignments");
        let result = sqlx::query_as::<_, SensorAssignmentEntity>(
            r#"
            SELECT * FROM sensor_assignments
            WHERE is_active = TRUE
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result
            .map_err(map_sqlx_error)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn find_assignment(&self, id: Uuid) -> Result<Option<SensorAssignment>, StoreError> {
        let timer = QueryTimer::new("find_assignment");
        let result = sqlx::query_as::<_, SensorAssignmentEntity>(
            r#"
            SELECT * FROM sensor_assignments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_sqlx_error)?.map(Into::into))
    }

    async fn create_assignment(
        &self,
        request: &CreateSensorAssignmentRequest,
    ) -> Result<SensorAssignment, StoreError> {
        let timer = QueryTimer::new("create_assignment");
        let result = sqlx::query_as::<_, SensorAssignmentEntity>(
            r#"
            INSERT INTO sensor_assignments (id, sensor_id, pharmacy_id, location_category, label)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.sensor_id)
        .bind(request.pharmacy_id)
        .bind(LocationCategoryDb::from(request.location_category))
        .bind(&request.label)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_sqlx_error)?.into())
    }

    async fn reassign(
        &self,
        id: Uuid,
        request: &UpdateSensorAssignmentRequest,
    ) -> Result<SensorAssignment, StoreError> {
        let timer = QueryTimer::new("reassign");
        let result = sqlx::query_as::<_, SensorAssignmentEntity>(
            r#"
            UPDATE sensor_assignments
            SET pharmacy_id = COALESCE($2, pharmacy_id),
                location_category = COALESCE($3, location_category),
                label = COALESCE($4, label),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.pharmacy_id)
        .bind(request.location_category.map(LocationCategoryDb::from))
        .bind(&request.label)
        .bind(request.is_active)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
            .map_err(map_sqlx_error)?
            .map(Into::into)
            .ok_or_else(|| StoreError::NotFound(format!("Sensor assignment {}", id)))
    }

    async fn deactivate_assignment(&self, id: Uuid) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("deactivate_assignment");
        let result = sqlx::query(
            r#"
            UPDATE sensor_assignments
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_sqlx_error)?.rows_affected() > 0)
    }
}
