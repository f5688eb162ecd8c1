//! Threshold registry: location category to acceptable ranges.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::LocationCategory;

/// Default battery floor in volts for all built-in profiles.
pub const DEFAULT_MIN_BATTERY_VOLTAGE: f64 = 2.5;

/// Acceptable ranges for one location category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdProfile {
    pub min_temp: f64,
    pub max_temp: f64,
    pub min_humidity: Option<f64>,
    pub max_humidity: Option<f64>,
    pub min_battery_voltage: f64,
}

impl ThresholdProfile {
    pub const REFRIGERATOR: ThresholdProfile = ThresholdProfile {
        min_temp: 2.0,
        max_temp: 8.0,
        min_humidity: None,
        max_humidity: None,
        min_battery_voltage: DEFAULT_MIN_BATTERY_VOLTAGE,
    };

    pub const FREEZER: ThresholdProfile = ThresholdProfile {
        min_temp: -25.0,
        max_temp: -15.0,
        min_humidity: None,
        max_humidity: None,
        min_battery_voltage: DEFAULT_MIN_BATTERY_VOLTAGE,
    };

    /// Controlled room temperature storage.
    pub const STORAGE: ThresholdProfile = ThresholdProfile {
        min_temp: 15.0,
        max_temp: 25.0,
        min_humidity: Some(30.0),
        max_humidity: Some(60.0),
        min_battery_voltage: DEFAULT_MIN_BATTERY_VOLTAGE,
    };

    pub const OTHER: ThresholdProfile = ThresholdProfile {
        min_temp: 2.0,
        max_temp: 25.0,
        min_humidity: None,
        max_humidity: None,
        min_battery_voltage: DEFAULT_MIN_BATTERY_VOLTAGE,
    };

    /// Whether the profile bounds humidity at all.
    pub fn has_humidity_bounds(&self) -> bool {
        self.min_humidity.is_some() || self.max_humidity.is_some()
    }
}

/// Source of threshold profiles.
///
/// The tenant key lets a deployment override ranges for a single pharmacy.
pub trait ThresholdSource: Send + Sync {
    fn thresholds_for(&self, category: LocationCategory, tenant: Option<Uuid>) -> ThresholdProfile;
}

/// Built-in profiles with optional per-tenant overrides.
#[derive(Debug, Clone, Default)]
pub struct StaticThresholds {
    overrides: HashMap<(Uuid, LocationCategory), ThresholdProfile>,
}

impl StaticThresholds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant_override(
        mut self,
        tenant: Uuid,
        category: LocationCategory,
        profile: ThresholdProfile,
    ) -> Self {
        self.overrides.insert((tenant, category), profile);
        self
    }

    /// Built-in profile for a category.
    pub fn builtin(category: LocationCategory) -> ThresholdProfile {
        match category {
            LocationCategory::Refrigerator => ThresholdProfile::REFRIGERATOR,
            LocationCategory::Freezer => ThresholdProfile::FREEZER,
            LocationCategory::Storage => ThresholdProfile::STORAGE,
            LocationCategory::Other => ThresholdProfile::OTHER,
        }
    }
}

impl ThresholdSource for StaticThresholds {
    fn thresholds_for(&self, category: LocationCategory, tenant: Option<Uuid>) -> ThresholdProfile {
        tenant
            .and_then(|t| self.overrides.get(&(t, category)).copied())
            .unwrap_or_else(|| Self::builtin(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refrigerator_range() {
        let profile = StaticThresholds::new().thresholds_for(LocationCategory::Refrigerator, None);
        assert_eq!(profile.min_temp, 2.0);
        assert_eq!(profile.max_temp, 8.0);
        assert!(!profile.has_humidity_bounds());
    }

    #[test]
    fn test_unknown_category_falls_back_to_other() {
        let category = LocationCategory::parse_lenient("vaccine cabinet");
        let profile = StaticThresholds::new().thresholds_for(category, None);
        assert_eq!(profile, ThresholdProfile::OTHER);
    }

    #[test]
    fn test_storage_has_humidity_bounds() {
        let profile = StaticThresholds::builtin(LocationCategory::Storage);
        assert!(profile.has_humidity_bounds());
        assert_eq!(profile.max_humidity, Some(60.0));
    }

    #[test]
    fn test_tenant_override() {
        let tenant = Uuid::new_v4();
        let custom = ThresholdProfile {
            min_temp: 3.0,
            max_temp: 7.0,
            ..ThresholdProfile::REFRIGERATOR
        };
        let registry = StaticThresholds::new().with_tenant_override(
            tenant,
            LocationCategory::Refrigerator,
            custom,
        );

        assert_eq!(
            registry.thresholds_for(LocationCategory::Refrigerator, Some(tenant)),
            custom
        );
        assert_eq!(
            registry.thresholds_for(LocationCategory::Refrigerator, Some(Uuid::new_v4())),
            ThresholdProfile::REFRIGERATOR
        );
        assert_eq!(
            registry.thresholds_for(LocationCategory::Freezer, Some(tenant)),
            ThresholdProfile::FREEZER
        );
    }
}
