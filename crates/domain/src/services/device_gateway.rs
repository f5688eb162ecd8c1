//! External device gateway (vendor API) abstraction.
//!
//! The vendor's loosely typed payloads are decoded at the client boundary and
//! converted into these types before reaching the engine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::GatewayError;

/// A sensor as listed in the vendor inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorSensor {
    pub name: String,
    pub battery_voltage: Option<f64>,
    pub last_seen: Option<DateTime<Utc>>,
    pub active: bool,
}

/// A gateway as listed in the vendor inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorGateway {
    pub name: String,
    pub last_seen: Option<DateTime<Utc>>,
    pub paired: bool,
}

/// The latest reading reported for a sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorReading {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Vendor API client used by sweeps and syncs.
///
/// Implementations bound every call with a timeout and never retry inside a
/// single invocation.
#[async_trait::async_trait]
pub trait DeviceGateway: Send + Sync {
    /// Obtains (or reuses) a session token.
    async fn authenticate(&self) -> Result<(), GatewayError>;

    async fn list_sensors(&self) -> Result<BTreeMap<String, VendorSensor>, GatewayError>;

    async fn list_gateways(&self) -> Result<BTreeMap<String, VendorGateway>, GatewayError>;

    /// Latest readings for the given sensor ids. Ids absent from the result
    /// are "not present".
    async fn latest_readings(
        &self,
        sensor_ids: &[String],
    ) -> Result<BTreeMap<String, VendorReading>, GatewayError>;
}
