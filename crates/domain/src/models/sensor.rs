//! Local sensor mirror.
//!
//! The snapshot fields cache the last reading seen during a sweep. They are
//! informational only; sweeps always evaluate the vendor's latest values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
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

/// Input for inserting a sensor discovered in the vendor inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSensor {
    pub external_id: String,
    pub name: String,
    pub gateway_id: Uuid,
    pub battery_voltage: Option<f64>,
    pub active: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
}

/// Fields refreshed on an already known sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorUpdate {
    pub name: String,
    pub battery_voltage: Option<f64>,
    pub active: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
}
