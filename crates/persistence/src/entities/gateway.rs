//! Gateway entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the gateways table.
#[derive(Debug, Clone, FromRow)]
pub struct GatewayEntity {
    pub id: Uuid,
    pub external_id: String,
    pub name: String,
    pub pharmacy_id: Option<Uuid>,
    pub paired: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GatewayEntity> for domain::models::Gateway {
    fn from(entity: GatewayEntity) -> Self {
        Self {
            id: entity.id,
            external_id: entity.external_id,
            name: entity.name,
            pharmacy_id: entity.pharmacy_id,
            paired: entity.paired,
            last_seen_at: entity.last_seen_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
