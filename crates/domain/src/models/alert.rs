//! Alert domain model.
//!
//! At most one unresolved alert exists per (sensor, alert type). Resolved
//! alerts are immutable history; a later violation of the same type opens a
//! new row instead of reopening the old one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Kind of out-of-range condition an alert tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    TemperatureHigh,
    TemperatureLow,
    /// High and low humidity share one type.
    Humidity,
    BatteryLow,
    Offline,
}

impl AlertType {
    pub const ALL: [AlertType; 5] = [
        AlertType::TemperatureHigh,
        AlertType::TemperatureLow,
        AlertType::Humidity,
        AlertType::BatteryLow,
        AlertType::Offline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::TemperatureHigh => "temperature_high",
            AlertType::TemperatureLow => "temperature_low",
            AlertType::Humidity => "humidity",
            AlertType::BatteryLow => "battery_low",
            AlertType::Offline => "offline",
        }
    }
}

impl FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "temperature_high" => Ok(AlertType::TemperatureHigh),
            "temperature_low" => Ok(AlertType::TemperatureLow),
            "humidity" => Ok(AlertType::Humidity),
            "battery_low" => Ok(AlertType::BatteryLow),
            "offline" => Ok(AlertType::Offline),
            _ => Err(format!("Unknown alert type: {}", s)),
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Alert severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        }
    }
}

impl FromStr for AlertSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(AlertSeverity::Low),
            "medium" => Ok(AlertSeverity::Medium),
            "high" => Ok(AlertSeverity::High),
            "critical" => Ok(AlertSeverity::Critical),
            _ => Err(format!("Unknown alert severity: {}", s)),
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies the sensor an alert belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorKey {
    /// External (vendor) sensor id.
    pub sensor_id: String,
    pub pharmacy_id: Uuid,
}

impl SensorKey {
    pub fn new(sensor_id: impl Into<String>, pharmacy_id: Uuid) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            pharmacy_id,
        }
    }
}

impl std::fmt::Display for SensorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.sensor_id, self.pharmacy_id)
    }
}

/// A persisted alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub sensor_id: String,
    pub pharmacy_id: Uuid,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub current_value: f64,
    pub threshold_value: f64,
    pub message: String,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub resolved_note: Option<String>,
}

impl Alert {
    pub fn key(&self) -> SensorKey {
        SensorKey::new(self.sensor_id.clone(), self.pharmacy_id)
    }

    pub fn is_open(&self) -> bool {
        !self.resolved
    }
}

/// Input for opening a new alert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub sensor_id: String,
    pub pharmacy_id: Uuid,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub current_value: f64,
    pub threshold_value: f64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Resolution details applied to an open alert.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveAlert {
    pub resolved_at: DateTime<Utc>,
    /// `None` for automatic resolution.
    pub resolved_by: Option<Uuid>,
    pub note: Option<String>,
}

/// Request payload for manually resolving an alert.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResolveAlertRequest {
    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_type_round_trips_through_str() {
        for alert_type in AlertType::ALL {
            assert_eq!(alert_type.as_str().parse::<AlertType>().unwrap(), alert_type);
        }
        assert!("temperature".parse::<AlertType>().is_err());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(AlertSeverity::Low < AlertSeverity::Medium);
        assert!(AlertSeverity::Medium < AlertSeverity::High);
        assert!(AlertSeverity::High < AlertSeverity::Critical);
    }

    #[test]
    fn test_alert_type_serialization() {
        let json = serde_json::to_string(&AlertType::TemperatureHigh).unwrap();
        assert_eq!(json, "\"temperature_high\"");
        let json = serde_json::to_string(&AlertSeverity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }

    #[test]
    fn test_sensor_key_display() {
        let pharmacy_id = Uuid::nil();
        let key = SensorKey::new("SN-1", pharmacy_id);
        assert_eq!(
            key.to_string(),
            "SN-1@00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_resolve_request_note_length() {
        let request = ResolveAlertRequest {
            note: Some("n".repeat(501)),
        };
        assert!(request.validate().is_err());

        let request: ResolveAlertRequest =
            serde_json::from_str(r#"{"note": "Door was left open"}"#).unwrap();
        assert!(request.validate().is_ok());
    }
}
