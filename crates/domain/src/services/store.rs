//! Persistence traits required by the alert engine and device sync.
//!
//! Implemented by the `persistence` crate over PostgreSQL and by
//! [`crate::services::mock::InMemoryStore`] for tests.

use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{
    Alert, CreateSensorAssignmentRequest, Gateway, GatewayUpdate, NewAlert, NewGateway,
    NewSensor, Pharmacy, ResolveAlert, Sensor, SensorAssignment, SensorSnapshot,
    SensorUpdate, UpdateSensorAssignmentRequest,
};

/// Sensor assignment storage.
#[async_trait::async_trait]
pub trait AssignmentStore: Send + Sync {
    /// All assignments with `is_active = true`.
    async fn list_active_assignments(&self) -> Result<Vec<SensorAssignment>, StoreError>;

    async fn find_assignment(&self, id: Uuid) -> Result<Option<SensorAssignment>, StoreError>;

    /// Fails with `Conflict` if the (sensor, pharmacy) pair already exists.
    async fn create_assignment(
        &self,
        request: &CreateSensorAssignmentRequest,
    ) -> Result<SensorAssignment, StoreError>;

    /// Applies a partial update; `NotFound` if the assignment does not exist.
    async fn reassign(
        &self,
        id: Uuid,
        request: &UpdateSensorAssignmentRequest,
    ) -> Result<SensorAssignment, StoreError>;

    /// Soft-deactivates. Returns false if it was already inactive or missing.
    async fn deactivate_assignment(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Alert storage.
#[async_trait::async_trait]
pub trait AlertStore: Send + Sync {
    /// Unresolved alerts for one sensor id across all pharmacies, newest
    /// first. Openness is unique per (sensor id, type), not per pharmacy.
    async fn open_alerts_for_sensor(&self, sensor_id: &str) -> Result<Vec<Alert>, StoreError>;

    /// Fails with `Conflict` if an open alert of the same type already exists.
    async fn create_alert(&self, alert: NewAlert) -> Result<Alert, StoreError>;

    /// Updates value, message and `updated_at` of an open alert.
    async fn refresh_alert(
        &self,
        id: Uuid,
        current_value: f64,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError>;

    /// Marks an open alert resolved. Resolving an already resolved alert
    /// returns it unchanged.
    async fn resolve_alert(&self, id: Uuid, resolution: ResolveAlert) -> Result<Alert, StoreError>;

    async fn find_alert(&self, id: Uuid) -> Result<Option<Alert>, StoreError>;

    /// Open alerts, optionally scoped to one pharmacy, newest first.
    async fn list_open_alerts(&self, pharmacy_id: Option<Uuid>) -> Result<Vec<Alert>, StoreError>;
}

/// Local registry of vendor gateways and sensors.
#[async_trait::async_trait]
pub trait DeviceRegistry: Send + Sync {
    async fn find_gateway_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Gateway>, StoreError>;

    async fn list_gateways(&self) -> Result<Vec<Gateway>, StoreError>;

    async fn insert_gateway(&self, gateway: NewGateway) -> Result<Gateway, StoreError>;

    async fn update_gateway(&self, id: Uuid, update: GatewayUpdate) -> Result<Gateway, StoreError>;

    async fn find_sensor_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Sensor>, StoreError>;

    async fn insert_sensor(&self, sensor: NewSensor) -> Result<Sensor, StoreError>;

    async fn update_sensor(&self, id: Uuid, update: SensorUpdate) -> Result<Sensor, StoreError>;

    /// Caches the last reading on the local sensor. Returns false if the
    /// sensor is not in the registry.
    async fn record_sensor_snapshot(
        &self,
        external_id: &str,
        snapshot: SensorSnapshot,
    ) -> Result<bool, StoreError>;
}

/// Read access to the tenant list used by inference.
#[async_trait::async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn list_tenants(&self) -> Result<Vec<Pharmacy>, StoreError>;
}

/// Lease-based run lock keyed by job name.
///
/// Prevents overlapping sweeps (or syncs) across processes. A lease expires
/// after `ttl` so a crashed holder cannot block the job forever.
#[async_trait::async_trait]
pub trait JobLock: Send + Sync {
    async fn try_acquire(&self, job: &str, holder: Uuid, ttl: Duration) -> Result<bool, StoreError>;

    async fn release(&self, job: &str, holder: Uuid) -> Result<(), StoreError>;
}
