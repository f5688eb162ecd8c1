//! Gateway domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A vendor hub that relays readings from one or more sensors.
///
/// Rows are created and updated only by the device sync reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gateway {
    pub id: Uuid,
    pub external_id: String,
    pub name: String,
    pub pharmacy_id: Option<Uuid>,
    pub paired: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a gateway discovered in the vendor inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGateway {
    pub external_id: String,
    pub name: String,
    pub pharmacy_id: Uuid,
    pub paired: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
}

/// Fields refreshed on an already known gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayUpdate {
    pub name: String,
    pub paired: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
    /// Only set when the gateway had no owner and one was inferred this pass.
    pub pharmacy_id: Option<Uuid>,
    pub now: DateTime<Utc>,
}
