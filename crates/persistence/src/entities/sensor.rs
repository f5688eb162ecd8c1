//! Sensor entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the sensors table.
#[derive(Debug, Clone, FromRow)]
pub struct SensorEntity {
    pub id: Uuid,
    pub external_id: String,
    pub name: String,
    pub gateway_id: Uuid,
    pub battery_voltage: Option<f64>,
    pub active: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub last_temperature: Option<f64>,
    pub last_humidity: Option<f64>,
    pub last_reading_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SensorEntity> for domain::models::Sensor {
    fn from(entity: SensorEntity) -> Self {
        Self {
            id: entity.id,
            external_id: entity.external_id,
            name: entity.name,
            gateway_id: entity.gateway_id,
            battery_voltage: entity.battery_voltage,
            active: entity.active,
            last_seen_at: entity.last_seen_at,
            last_temperature: entity.last_temperature,
            last_humidity: entity.last_humidity,
            last_reading_at: entity.last_reading_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
