//! Reading types consumed by the alert evaluator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The latest known values for one sensor during a sweep.
///
/// `present == false` means the vendor returned nothing for the sensor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub battery_voltage: Option<f64>,
    pub present: bool,
    pub timestamp: Option<DateTime<Utc>>,
}

impl SensorReading {
    /// A reading for a sensor that was absent from the vendor response.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn with_temperature(temperature: f64) -> Self {
        Self {
            temperature: Some(temperature),
            present: true,
            ..Default::default()
        }
    }

    pub fn humidity(mut self, humidity: f64) -> Self {
        self.humidity = Some(humidity);
        self
    }

    pub fn battery(mut self, voltage: f64) -> Self {
        self.battery_voltage = Some(voltage);
        self
    }
}

/// Cached reading written back to the local sensor mirror.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSnapshot {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub reading_at: DateTime<Utc>,
}
