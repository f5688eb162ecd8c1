//! Device sync reconciler.
//!
//! Mirrors the vendor's gateway and sensor inventory into the local device
//! registry. Known devices are refreshed in place; new devices are inserted
//! only when their owner can be inferred. Everything else is reported as a
//! per-item issue and the pass carries on.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::SyncError;
use crate::models::{Gateway, GatewayUpdate, NewGateway, NewSensor, Pharmacy, SensorUpdate};
use crate::services::clock::Clock;
use crate::services::device_gateway::{DeviceGateway, VendorGateway, VendorSensor};
use crate::services::inference::{Inference, TenantInferenceEngine};
use crate::services::store::{DeviceRegistry, TenantDirectory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Gateway,
    Sensor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncIssueKind {
    /// No inference rule identified the owning pharmacy.
    UnresolvedTenant,
    /// No inference rule identified the sensor's gateway.
    UnresolvedGateway,
    /// The registry write failed.
    Store,
}

/// A device that could not be synced; needs manual attention.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncIssue {
    pub device: DeviceKind,
    pub external_id: String,
    pub name: String,
    pub kind: SyncIssueKind,
    pub message: String,
}

/// Counts and issues from one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub gateways_created: usize,
    pub gateways_updated: usize,
    pub sensors_created: usize,
    pub sensors_updated: usize,
    pub issues: Vec<SyncIssue>,
}

impl SyncSummary {
    pub fn created(&self) -> usize {
        self.gateways_created + self.sensors_created
    }

    pub fn updated(&self) -> usize {
        self.gateways_updated + self.sensors_updated
    }
}

enum Upsert {
    Created,
    Updated,
}

pub struct DeviceSyncReconciler {
    gateway: Arc<dyn DeviceGateway>,
    registry: Arc<dyn DeviceRegistry>,
    tenants: Arc<dyn TenantDirectory>,
    inference: TenantInferenceEngine,
    clock: Arc<dyn Clock>,
}

impl DeviceSyncReconciler {
    pub fn new(
        gateway: Arc<dyn DeviceGateway>,
        registry: Arc<dyn DeviceRegistry>,
        tenants: Arc<dyn TenantDirectory>,
        inference: TenantInferenceEngine,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gateway,
            registry,
            tenants,
            inference,
            clock,
        }
    }

    /// Runs one inventory pass.
    ///
    /// Vendor and tenant-list failures abort the pass; per-device failures
    /// are collected in the summary.
    pub async fn sync(&self) -> Result<SyncSummary, SyncError> {
        self.gateway.authenticate().await?;
        let vendor_gateways = self.gateway.list_gateways().await?;
        let vendor_sensors = self.gateway.list_sensors().await?;
        let tenants = self.tenants.list_tenants().await?;

        debug!(
            gateways = vendor_gateways.len(),
            sensors = vendor_sensors.len(),
            tenants = tenants.len(),
            "Vendor inventory fetched"
        );

        let mut summary = SyncSummary::default();

        for (external_id, vendor) in &vendor_gateways {
            match self.sync_gateway(external_id, vendor, &tenants).await {
                Ok(Upsert::Created) => summary.gateways_created += 1,
                Ok(Upsert::Updated) => summary.gateways_updated += 1,
                Err(issue) => summary.issues.push(issue),
            }
        }

        let local_gateways = self.registry.list_gateways().await?;

        for (external_id, vendor) in &vendor_sensors {
            match self
                .sync_sensor(external_id, vendor, &local_gateways, &tenants)
                .await
            {
                Ok(Upsert::Created) => summary.sensors_created += 1,
                Ok(Upsert::Updated) => summary.sensors_updated += 1,
                Err(issue) => summary.issues.push(issue),
            }
        }

        for issue in &summary.issues {
            warn!(
                device = ?issue.device,
                external_id = %issue.external_id,
                name = %issue.name,
                kind = ?issue.kind,
                message = %issue.message,
                "Device sync issue"
            );
        }

        info!(
            gateways_created = summary.gateways_created,
            gateways_updated = summary.gateways_updated,
            sensors_created = summary.sensors_created,
            sensors_updated = summary.sensors_updated,
            issues = summary.issues.len(),
            "Device sync completed"
        );

        Ok(summary)
    }

    async fn sync_gateway(
        &self,
        external_id: &str,
        vendor: &VendorGateway,
        tenants: &[Pharmacy],
    ) -> Result<Upsert, SyncIssue> {
        let now = self.clock.now();
        let store_issue = |e: crate::errors::StoreError| SyncIssue {
            device: DeviceKind::Gateway,
            external_id: external_id.to_string(),
            name: vendor.name.clone(),
            kind: SyncIssueKind::Store,
            message: e.to_string(),
        };

        let existing = self
            .registry
            .find_gateway_by_external_id(external_id)
            .await
            .map_err(store_issue)?;

        if let Some(existing) = existing {
            let pharmacy_id = match existing.pharmacy_id {
                Some(_) => None,
                None => self.inference.infer_tenant(&vendor.name, tenants).id(),
            };
            if existing.pharmacy_id.is_none() && pharmacy_id.is_none() {
                debug!(external_id, name = %vendor.name, "Gateway still has no pharmacy");
            }
            self.registry
                .update_gateway(
                    existing.id,
                    GatewayUpdate {
                        name: vendor.name.clone(),
                        paired: vendor.paired,
                        last_seen_at: vendor.last_seen,
                        pharmacy_id,
                        now,
                    },
                )
                .await
                .map_err(store_issue)?;
            return Ok(Upsert::Updated);
        }

        match self.inference.infer_tenant(&vendor.name, tenants) {
            Inference::Resolved { id, rule } => {
                self.registry
                    .insert_gateway(NewGateway {
                        external_id: external_id.to_string(),
                        name: vendor.name.clone(),
                        pharmacy_id: id,
                        paired: vendor.paired,
                        last_seen_at: vendor.last_seen,
                        now,
                    })
                    .await
                    .map_err(store_issue)?;
                info!(external_id, pharmacy_id = %id, rule, "Gateway created");
                Ok(Upsert::Created)
            }
            Inference::Unresolved => Err(SyncIssue {
                device: DeviceKind::Gateway,
                external_id: external_id.to_string(),
                name: vendor.name.clone(),
                kind: SyncIssueKind::UnresolvedTenant,
                message: format!(
                    "No pharmacy matches gateway name '{}'; assign it manually",
                    vendor.name
                ),
            }),
        }
    }

    async fn sync_sensor(
        &self,
        external_id: &str,
        vendor: &VendorSensor,
        gateways: &[Gateway],
        tenants: &[Pharmacy],
    ) -> Result<Upsert, SyncIssue> {
        let now = self.clock.now();
        let store_issue = |e: crate::errors::StoreError| SyncIssue {
            device: DeviceKind::Sensor,
            external_id: external_id.to_string(),
            name: vendor.name.clone(),
            kind: SyncIssueKind::Store,
            message: e.to_string(),
        };

        let existing = self
            .registry
            .find_sensor_by_external_id(external_id)
            .await
            .map_err(store_issue)?;

        if let Some(existing) = existing {
            self.registry
                .update_sensor(
                    existing.id,
                    SensorUpdate {
                        name: vendor.name.clone(),
                        battery_voltage: vendor.battery_voltage,
                        active: vendor.active,
                        last_seen_at: vendor.last_seen,
                        now,
                    },
                )
                .await
                .map_err(store_issue)?;
            return Ok(Upsert::Updated);
        }

        match self
            .inference
            .infer_gateway_for_sensor(&vendor.name, gateways, tenants)
        {
            Inference::Resolved { id, rule } => {
                self.registry
                    .insert_sensor(NewSensor {
                        external_id: external_id.to_string(),
                        name: vendor.name.clone(),
                        gateway_id: id,
                        battery_voltage: vendor.battery_voltage,
                        active: vendor.active,
                        last_seen_at: vendor.last_seen,
                        now,
                    })
                    .await
                    .map_err(store_issue)?;
                info!(external_id, gateway_id = %id, rule, "Sensor created");
                Ok(Upsert::Created)
            }
            Inference::Unresolved => Err(SyncIssue {
                device: DeviceKind::Sensor,
                external_id: external_id.to_string(),
                name: vendor.name.clone(),
                kind: SyncIssueKind::UnresolvedGateway,
                message: format!(
                    "Cannot determine gateway for sensor '{}' among {} known gateways",
                    vendor.name,
                    gateways.len()
                ),
            }),
        }
    }
}
