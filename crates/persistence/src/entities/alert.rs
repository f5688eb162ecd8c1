//! Alert entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{AlertSeverity, AlertType};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for alert_type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "alert_type", rename_all = "snake_case")]
pub enum AlertTypeDb {
    TemperatureHigh,
    TemperatureLow,
    Humidity,
    BatteryLow,
    Offline,
}

impl From<AlertTypeDb> for AlertType {
    fn from(db: AlertTypeDb) -> Self {
        match db {
            AlertTypeDb::TemperatureHigh => AlertType::TemperatureHigh,
            AlertTypeDb::TemperatureLow => AlertType::TemperatureLow,
            AlertTypeDb::Humidity => AlertType::Humidity,
            AlertTypeDb::BatteryLow => AlertType::BatteryLow,
            AlertTypeDb::Offline => AlertType::Offline,
        }
    }
}

impl From<AlertType> for AlertTypeDb {
    fn from(alert_type: AlertType) -> Self {
        match alert_type {
            AlertType::TemperatureHigh => AlertTypeDb::TemperatureHigh,
            AlertType::TemperatureLow => AlertTypeDb::TemperatureLow,
            AlertType::Humidity => AlertTypeDb::Humidity,
            AlertType::BatteryLow => AlertTypeDb::BatteryLow,
            AlertType::Offline => AlertTypeDb::Offline,
        }
    }
}

/// Database enum for alert_severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "alert_severity", rename_all = "lowercase")]
pub enum AlertSeverityDb {
    Low,
    Medium,
    High,
    Critical,
}

impl From<AlertSeverityDb> for AlertSeverity {
    fn from(db: AlertSeverityDb) -> Self {
        match db {
            AlertSeverityDb::Low => AlertSeverity::Low,
            AlertSeverityDb::Medium => AlertSeverity::Medium,
            AlertSeverityDb::High => AlertSeverity::High,
            AlertSeverityDb::Critical => AlertSeverity::Critical,
        }
    }
}

impl From<AlertSeverity> for AlertSeverityDb {
    fn from(severity: AlertSeverity) -> Self {
        match severity {
            AlertSeverity::Low => AlertSeverityDb::Low,
            AlertSeverity::Medium => AlertSeverityDb::Medium,
            AlertSeverity::High => AlertSeverityDb::High,
            AlertSeverity::Critical => AlertSeverityDb::Critical,
        }
    }
}

/// Database row mapping for the alerts table.
#[derive(Debug, Clone, FromRow)]
pub struct AlertEntity {
    pub id: Uuid,
    pub sensor_id: String,
    pub pharmacy_id: Uuid,
    pub alert_type: AlertTypeDb,
    pub severity: AlertSeverityDb,
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

impl From<AlertEntity> for domain::models::Alert {
    fn from(entity: AlertEntity) -> Self {
        Self {
            id: entity.id,
            sensor_id: entity.sensor_id,
            pharmacy_id: entity.pharmacy_id,
            alert_type: entity.alert_type.into(),
            severity: entity.severity.into(),
            current_value: entity.current_value,
            threshold_value: entity.threshold_value,
            message: entity.message,
            resolved: entity.resolved,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            resolved_at: entity.resolved_at,
            resolved_by: entity.resolved_by,
            resolved_note: entity.resolved_note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_type_conversion_is_lossless() {
        for alert_type in AlertType::ALL {
            let db: AlertTypeDb = alert_type.into();
            assert_eq!(AlertType::from(db), alert_type);
        }
    }

    #[test]
    fn test_severity_conversion() {
        assert_eq!(AlertSeverityDb::from(AlertSeverity::Critical), AlertSeverityDb::Critical);
        assert_eq!(AlertSeverity::from(AlertSeverityDb::Low), AlertSeverity::Low);
    }
}
