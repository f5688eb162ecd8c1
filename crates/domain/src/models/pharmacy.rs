//! Pharmacy (tenant) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pharmacy location that owns gateways, sensors and alert records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pharmacy {
    pub id: Uuid,
    pub name: String,
    /// Short code used in device naming (e.g. "DT01").
    pub code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Pharmacy {
    /// Builds an active pharmacy with a fresh id. Codes are stored upper-case.
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            code: code.into().trim().to_uppercase(),
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
