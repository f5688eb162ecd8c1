//! Sensor assignment entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::LocationCategory;
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for location_category that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "location_category", rename_all = "lowercase")]
pub enum LocationCategoryDb {
    Refrigerator,
    Freezer,
    Storage,
    Other,
}

impl From<LocationCategoryDb> for LocationCategory {
    fn from(db: LocationCategoryDb) -> Self {
        match db {
            LocationCategoryDb::Refrigerator => LocationCategory::Refrigerator,
            LocationCategoryDb::Freezer => LocationCategory::Freezer,
            LocationCategoryDb::Storage => LocationCategory::Storage,
            LocationCategoryDb::Other => LocationCategory::Other,
        }
    }
}

impl From<LocationCategory> for LocationCategoryDb {
    fn from(category: LocationCategory) -> Self {
        match category {
            LocationCategory::Refrigerator => LocationCategoryDb::Refrigerator,
            LocationCategory::Freezer => LocationCategoryDb::Freezer,
            LocationCategory::Storage => LocationCategoryDb::Storage,
            LocationCategory::Other => LocationCategoryDb::Other,
        }
    }
}

/// Database row mapping for the sensor_assignments table.
#[derive(Debug, Clone, FromRow)]
pub struct SensorAssignmentEntity {
    pub id: Uuid,
    pub sensor_id: String,
    pub pharmacy_id: Uuid,
    pub location_category: LocationCategoryDb,
    pub label: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SensorAssignmentEntity> for domain::models::SensorAssignment {
    fn from(entity: SensorAssignmentEntity) -> Self {
        Self {
            id: entity.id,
            sensor_id: entity.sensor_id,
            pharmacy_id: entity.pharmacy_id,
            location_category: entity.location_category.into(),
            label: entity.label,
            is_active: entity.is_active,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_category_conversion_is_lossless() {
        for category in [
            LocationCategory::Refrigerator,
            LocationCategory::Freezer,
            LocationCategory::Storage,
            LocationCategory::Other,
        ] {
            let db: LocationCategoryDb = category.into();
            assert_eq!(LocationCategory::from(db), category);
        }
    }
}
