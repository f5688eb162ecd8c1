//! Gateway and sensor repositories.
//!
//! [`DeviceRegistryRepository`] combines both tables behind the
//! `DeviceRegistry` trait used by the device sync reconciler and sweeps.

use async_trait::async_trait;
use domain::errors::StoreError;
use domain::models::{
    Gateway, GatewayUpdate, NewGateway, NewSensor, Sensor, SensorSnapshot, SensorUpdate,
};
use domain::services::DeviceRegistry;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{GatewayEntity, SensorEntity};
use crate::error::map_sqlx_error;
use crate::metrics::QueryTimer;

/// Repository for the gateways table.
#[derive(Clone)]
pub struct GatewayRepository {
    pool: PgPool,
}

impl GatewayRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Gateway>, StoreError> {
        let timer = QueryTimer::new("find_gateway_by_external_id");
        let result = sqlx::query_as::<_, GatewayEntity>(
            r#"
            SELECT * FROM gateways
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_sqlx_error)?.map(Into::into))
    }

    pub async fn list(&self) -> Result<Vec<Gateway>, StoreError> {
        let timer = QueryTimer::new("list_gateways");
        let result = sqlx::query_as::<_, GatewayEntity>(
            r#"
            SELECT * FROM gateways
            ORDER BY external_id
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

    pub async fn insert(&self, gateway: NewGateway) -> Result<Gateway, StoreError> {
        let timer = QueryTimer::new("insert_gateway");
        let result = sqlx::query_as::<_, GatewayEntity>(
            r#"
            INSERT INTO gateways (
                id, external_id, name, pharmacy_id, paired, last_seen_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&gateway.external_id)
        .bind(&gateway.name)
        .bind(gateway.pharmacy_id)
        .bind(gateway.paired)
        .bind(gateway.last_seen_at)
        .bind(gateway.now)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_sqlx_error)?.into())
    }

    /// Refreshes vendor fields. An owning pharmacy is only filled in, never
    /// replaced.
    pub async fn update(&self, id: Uuid, update: GatewayUpdate) -> Result<Gateway, StoreError> {
        let timer = QueryTimer::new("update_gateway");
        let result = sqlx::query_as::<_, GatewayEntity>(
            r#"
            UPDATE gateways
            SET name = $2,
                paired = $3,
                last_seen_at = COALESCE($4, last_seen_at),
                pharmacy_id = COALESCE(pharmacy_id, $5),
                updated_at = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(update.paired)
        .bind(update.last_seen_at)
        .bind(update.pharmacy_id)
        .bind(update.now)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
            .map_err(map_sqlx_error)?
            .map(Into::into)
            .ok_or_else(|| StoreError::NotFound(format!("Gateway {}", id)))
    }
}

/// Repository for the sensors table.
#[derive(Clone)]
pub struct SensorRepository {
    pool: PgPool,
}

impl SensorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Sensor>, StoreError> {
        let timer = QueryTimer::new("find_sensor_by_external_id");
        let result = sqlx::query_as::<_, SensorEntity>(
            r#"
            SELECT * FROM sensors
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_sqlx_error)?.map(Into::into))
    }

    pub async fn list_for_gateway(&self, gateway_id: Uuid) -> Result<Vec<Sensor>, StoreError> {
        let timer = QueryTimer::new("list_sensors_for_gateway");
        let result = sqlx::query_as::<_, SensorEntity>(
            r#"
            SELECT * FROM sensors
            WHERE gateway_id = $1
            ORDER BY external_id
            "#,
        )
        .bind(gateway_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result
            .map_err(map_sqlx_error)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub async fn insert(&self, sensor: NewSensor) -> Result<Sensor, StoreError> {
        let timer = QueryTimer::new("insert_sensor");
        let result = sqlx::query_as::<_, SensorEntity>(
            r#"
            INSERT INTO sensors (
                id, external_id, name, gateway_id, battery_voltage, active,
                last_seen_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&sensor.external_id)
        .bind(&sensor.name)
        .bind(sensor.gateway_id)
        .bind(sensor.battery_voltage)
        .bind(sensor.active)
        .bind(sensor.last_seen_at)
        .bind(sensor.now)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_sqlx_error)?.into())
    }

    pub async fn update(&self, id: Uuid, update: SensorUpdate) -> Result<Sensor, StoreError> {
        let timer = QueryTimer::new("update_sensor");
        let result = sqlx::query_as::<_, SensorEntity>(
            r#"
            UPDATE sensors
            SET name = $2,
                battery_voltage = COALESCE($3, battery_voltage),
                active = $4,
                last_seen_at = COALESCE($5, last_seen_at),
                updated_at = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(update.battery_voltage)
        .bind(update.active)
        .bind(update.last_seen_at)
        .bind(update.now)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
            .map_err(map_sqlx_error)?
            .map(Into::into)
            .ok_or_else(|| StoreError::NotFound(format!("Sensor {}", id)))
    }

    pub async fn record_snapshot(
        &self,
        external_id: &str,
        snapshot: SensorSnapshot,
    ) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("record_sensor_snapshot");
        let result = sqlx::query(
            r#"
            UPDATE sensors
            SET last_temperature = $2,
                last_humidity = $3,
                last_reading_at = $4
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .bind(snapshot.temperature)
        .bind(snapshot.humidity)
        .bind(snapshot.reading_at)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_sqlx_error)?.rows_affected() > 0)
    }
}

/// Gateways and sensors behind the `DeviceRegistry` trait.
#[derive(Clone)]
pub struct DeviceRegistryRepository {
    gateways: GatewayRepository,
    sensors: SensorRepository,
}

impl DeviceRegistryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            gateways: GatewayRepository::new(pool.clone()),
            sensors: SensorRepository::new(pool),
        }
    }

    pub fn gateways(&self) -> &GatewayRepository {
        &self.gateways
    }

    pub fn sensors(&self) -> &SensorRepository {
        &self.sensors
    }
}

#[async_trait]
impl DeviceRegistry for DeviceRegistryRepository {
    async fn find_gateway_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Gateway>, StoreError> {
        self.gateways.find_by_external_id(external_id).await
    }

    async fn list_gateways(&self) -> Result<Vec<Gateway>, StoreError> {
        self.gateways.list().await
    }

    async fn insert_gateway(&self, gateway: NewGateway) -> Result<Gateway, StoreError> {
        self.gateways.insert(gateway).await
    }

    async fn update_gateway(&self, id: Uuid, update: GatewayUpdate) -> Result<Gateway, StoreError> {
        self.gateways.update(id, update).await
    }

    async fn find_sensor_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Sensor>, StoreError> {
        self.sensors.find_by_external_id(external_id).await
    }

    async fn insert_sensor(&self, sensor: NewSensor) -> Result<Sensor, StoreError> {
        self.sensors.insert(sensor).await
    }

    async fn update_sensor(&self, id: Uuid, update: SensorUpdate) -> Result<Sensor, StoreError> {
        self.sensors.update(id, update).await
    }

    async fn record_sensor_snapshot(
        &self,
        external_id: &str,
        snapshot: SensorSnapshot,
    ) -> Result<bool, StoreError> {
        self.sensors.record_snapshot(external_id, snapshot).await
    }
}
