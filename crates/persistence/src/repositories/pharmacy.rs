//! Pharmacy repository implementation.

use async_trait::async_trait;
use domain::errors::StoreError;
use domain::models::Pharmacy;
use domain::services::TenantDirectory;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::PharmacyEntity;
use crate::error::map_sqlx_error;
use crate::metrics::QueryTimer;

/// Repository for pharmacy (tenant) lookups.
#[derive(Clone)]
pub struct PharmacyRepository {
    pool: PgPool,
}

impl PharmacyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Pharmacy>, StoreError> {
        let timer = QueryTimer::new("find_pharmacy_by_id");
        let result = sqlx::query_as::<_, PharmacyEntity>(
            r#"
            SELECT id, name, code, is_active, created_at
            FROM pharmacies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_sqlx_error)?.map(Into::into))
    }
}

#[async_trait]
impl TenantDirectory for PharmacyRepository {
    async fn list_tenants(&self) -> Result<Vec<Pharmacy>, StoreError> {
        let timer = QueryTimer::new("list_tenants");
        let result = sqlx::query_as::<_, PharmacyEntity>(
            r#"
            SELECT id, name, code, is_active, created_at
            FROM pharmacies
            WHERE is_active = TRUE
            ORDER BY name
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
}
