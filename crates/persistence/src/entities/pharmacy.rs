//! Pharmacy entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the pharmacies table.
#[derive(Debug, Clone, FromRow)]
pub struct PharmacyEntity {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PharmacyEntity> for domain::models::Pharmacy {
    fn from(entity: PharmacyEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            code: entity.code,
            is_active: entity.is_active,
            created_at: entity.created_at,
        }
    }
}
