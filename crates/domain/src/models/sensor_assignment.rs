//! Sensor assignment domain model.
//!
//! An assignment binds an external sensor id to a pharmacy and a location
//! category. The category selects the threshold profile used by sweeps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Where a sensor is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationCategory {
    Refrigerator,
    Freezer,
    Storage,
    Other,
}

impl LocationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationCategory::Refrigerator => "refrigerator",
            LocationCategory::Freezer => "freezer",
            LocationCategory::Storage => "storage",
            LocationCategory::Other => "other",
        }
    }

    /// Parses a stored category, falling back to `Other` for unknown values.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(LocationCategory::Other)
    }
}

impl FromStr for LocationCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "refrigerator" | "fridge" => Ok(LocationCategory::Refrigerator),
            "freezer" => Ok(LocationCategory::Freezer),
            "storage" => Ok(LocationCategory::Storage),
            "other" => Ok(LocationCategory::Other),
            _ => Err(format!("Unknown location category: {}", s)),
        }
    }
}

impl std::fmt::Display for LocationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tenant-scoped binding of an external sensor to a pharmacy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorAssignment {
    pub id: Uuid,
    /// External (vendor) sensor identifier.
    pub sensor_id: String,
    pub pharmacy_id: Uuid,
    pub location_category: LocationCategory,
    pub label: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for assigning a sensor to a pharmacy.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSensorAssignmentRequest {
    #[validate(length(min = 1, max = 100, message = "Sensor id must be 1-100 characters"))]
    pub sensor_id: String,

    pub pharmacy_id: Uuid,

    pub location_category: LocationCategory,

    #[validate(length(max = 100, message = "Label must be at most 100 characters"))]
    pub label: Option<String>,
}

/// Request payload for reassigning a sensor (partial update).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSensorAssignmentRequest {
    pub pharmacy_id: Option<Uuid>,

    pub location_category: Option<LocationCategory>,

    #[validate(length(max = 100, message = "Label must be at most 100 characters"))]
    pub label: Option<String>,

    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_category_from_str() {
        assert_eq!(
            "Refrigerator".parse::<LocationCategory>().unwrap(),
            LocationCategory::Refrigerator
        );
        assert_eq!(
            "fridge".parse::<LocationCategory>().unwrap(),
            LocationCategory::Refrigerator
        );
        assert_eq!(
            "freezer".parse::<LocationCategory>().unwrap(),
            LocationCategory::Freezer
        );
        assert!("cellar".parse::<LocationCategory>().is_err());
    }

    #[test]
    fn test_location_category_lenient_fallback() {
        assert_eq!(
            LocationCategory::parse_lenient("walk-in cooler"),
            LocationCategory::Other
        );
        assert_eq!(
            LocationCategory::parse_lenient("storage"),
            LocationCategory::Storage
        );
    }

    #[test]
    fn test_create_request_deserialization() {
        let json = r#"{
            "sensorId": "SN-1001",
            "pharmacyId": "550e8400-e29b-41d4-a716-446655440000",
            "locationCategory": "freezer"
        }"#;

        let request: CreateSensorAssignmentRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.sensor_id, "SN-1001");
        assert_eq!(request.location_category, LocationCategory::Freezer);
        assert!(request.label.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_request_rejects_empty_sensor_id() {
        let request = CreateSensorAssignmentRequest {
            sensor_id: String::new(),
            pharmacy_id: Uuid::new_v4(),
            location_category: LocationCategory::Refrigerator,
            label: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_update_request_label_too_long() {
        let request = UpdateSensorAssignmentRequest {
            label: Some("x".repeat(101)),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }
}
