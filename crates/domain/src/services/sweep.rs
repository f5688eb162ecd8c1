//! Sweep orchestrator.
//!
//! One sweep pulls the latest vendor readings for every actively assigned
//! sensor, evaluates them against the location's thresholds and reconciles
//! the result into alert state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::SweepError;
use crate::models::{SensorAssignment, SensorKey, SensorReading, SensorSnapshot};
use crate::services::clock::Clock;
use crate::services::device_gateway::{DeviceGateway, VendorReading};
use crate::services::evaluator::evaluate;
use crate::services::lifecycle::AlertLifecycleManager;
use crate::services::store::{AssignmentStore, DeviceRegistry};
use crate::services::thresholds::ThresholdSource;

pub const DEFAULT_READING_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    /// Sensor ids per latest-readings request.
    pub reading_batch_size: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            reading_batch_size: DEFAULT_READING_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepIssueKind {
    /// A second active assignment for a sensor that was already processed.
    DuplicateAssignment,
    /// Alert reconciliation failed for the sensor.
    Store,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepIssue {
    pub sensor_id: String,
    pub assignment_id: Uuid,
    pub kind: SweepIssueKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    pub assignments: usize,
    pub readings: usize,
    pub evaluated: usize,
    pub offline: usize,
    pub alerts_created: usize,
    pub alerts_refreshed: usize,
    pub alerts_resolved: usize,
    pub issues: Vec<SweepIssue>,
}

pub struct SweepOrchestrator {
    assignments: Arc<dyn AssignmentStore>,
    lifecycle: AlertLifecycleManager,
    gateway: Arc<dyn DeviceGateway>,
    registry: Arc<dyn DeviceRegistry>,
    thresholds: Arc<dyn ThresholdSource>,
    clock: Arc<dyn Clock>,
    config: SweepConfig,
}

impl SweepOrchestrator {
    pub fn new(
        assignments: Arc<dyn AssignmentStore>,
        lifecycle: AlertLifecycleManager,
        gateway: Arc<dyn DeviceGateway>,
        registry: Arc<dyn DeviceRegistry>,
        thresholds: Arc<dyn ThresholdSource>,
        clock: Arc<dyn Clock>,
        config: SweepConfig,
    ) -> Self {
        Self {
            assignments,
            lifecycle,
            gateway,
            registry,
            thresholds,
            clock,
            config,
        }
    }

    /// Runs one sweep.
    ///
    /// Returns an error only when the pass cannot proceed at all (assignment
    /// load, authentication or a non-timeout readings failure). Per-sensor
    /// failures are reported in [`SweepSummary::issues`].
    pub async fn run_sweep(&self) -> Result<SweepSummary, SweepError> {
        let mut summary = SweepSummary::default();

        let active = self.assignments.list_active_assignments().await?;
        summary.assignments = active.len();
        if active.is_empty() {
            info!("No active sensor assignments, skipping sweep");
            return Ok(summary);
        }

        let (assignments, duplicates) = dedupe_assignments(active);
        summary.issues.extend(duplicates);

        self.gateway.authenticate().await?;

        let sensor_ids: Vec<String> = assignments.iter().map(|a| a.sensor_id.clone()).collect();
        let readings = self.fetch_readings(&sensor_ids).await?;
        summary.readings = readings.len();
        if readings.is_empty() {
            warn!(
                sensors = sensor_ids.len(),
                "Vendor returned no readings, skipping evaluation"
            );
            return Ok(summary);
        }

        let batteries = self.battery_voltages().await;

        for assignment in &assignments {
            let vendor = readings.get(&assignment.sensor_id);
            let reading = build_reading(vendor, batteries.get(&assignment.sensor_id).copied());
            let profile = self
                .thresholds
                .thresholds_for(assignment.location_category, Some(assignment.pharmacy_id));
            let evaluation = evaluate(&reading, &profile);

            summary.evaluated += 1;
            if evaluation.is_offline() {
                summary.offline += 1;
            }

            let key = SensorKey::new(assignment.sensor_id.clone(), assignment.pharmacy_id);
            match self.lifecycle.reconcile(&key, &evaluation).await {
                Ok(outcome) => {
                    summary.alerts_created += outcome.created;
                    summary.alerts_refreshed += outcome.refreshed;
                    summary.alerts_resolved += outcome.resolved;
                }
                Err(e) => {
                    warn!(sensor = %key, error = %e, "Failed to reconcile alerts");
                    summary.issues.push(SweepIssue {
                        sensor_id: assignment.sensor_id.clone(),
                        assignment_id: assignment.id,
                        kind: SweepIssueKind::Store,
                        message: e.to_string(),
                    });
                }
            }

            if let Some(vendor) = vendor {
                self.record_snapshot(&assignment.sensor_id, vendor).await;
            }
        }

        info!(
            assignments = summary.assignments,
            readings = summary.readings,
            evaluated = summary.evaluated,
            offline = summary.offline,
            alerts_created = summary.alerts_created,
            alerts_refreshed = summary.alerts_refreshed,
            alerts_resolved = summary.alerts_resolved,
            issues = summary.issues.len(),
            "Sweep completed"
        );

        Ok(summary)
    }

    /// Fetches readings in chunks. A timed-out chunk leaves its sensors
    /// without a reading; any other failure aborts.
    async fn fetch_readings(
        &self,
        sensor_ids: &[String],
    ) -> Result<BTreeMap<String, VendorReading>, SweepError> {
        let mut readings = BTreeMap::new();
        for chunk in sensor_ids.chunks(self.config.reading_batch_size.max(1)) {
            match self.gateway.latest_readings(chunk).await {
                Ok(batch) => readings.extend(batch),
                Err(e) if e.is_timeout() => {
                    warn!(
                        sensors = chunk.len(),
                        error = %e,
                        "Readings request timed out, treating chunk as offline"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(readings)
    }

    async fn battery_voltages(&self) -> HashMap<String, f64> {
        match self.gateway.list_sensors().await {
            Ok(sensors) => sensors
                .into_iter()
                .filter_map(|(id, s)| s.battery_voltage.map(|v| (id, v)))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Sensor inventory unavailable, battery levels unknown");
                HashMap::new()
            }
        }
    }

    async fn record_snapshot(&self, sensor_id: &str, vendor: &VendorReading) {
        let snapshot = SensorSnapshot {
            temperature: vendor.temperature,
            humidity: vendor.humidity,
            reading_at: vendor.timestamp.unwrap_or_else(|| self.clock.now()),
        };
        match self.registry.record_sensor_snapshot(sensor_id, snapshot).await {
            Ok(true) => {}
            Ok(false) => debug!(sensor_id, "Sensor not in local registry, snapshot skipped"),
            Err(e) => warn!(sensor_id, error = %e, "Failed to record sensor snapshot"),
        }
    }
}

/// Keeps the oldest active assignment per sensor id.
fn dedupe_assignments(mut active: Vec<SensorAssignment>) -> (Vec<SensorAssignment>, Vec<SweepIssue>) {
    active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let mut kept: Vec<SensorAssignment> = Vec::with_capacity(active.len());
    let mut issues = Vec::new();
    let mut seen: HashMap<String, Uuid> = HashMap::new();

    for assignment in active {
        match seen.get(&assignment.sensor_id) {
            Some(&winner) => issues.push(SweepIssue {
                sensor_id: assignment.sensor_id.clone(),
                assignment_id: assignment.id,
                kind: SweepIssueKind::DuplicateAssignment,
                message: format!(
                    "Sensor {} is also actively assigned by {}; this assignment was skipped",
                    assignment.sensor_id, winner
                ),
            }),
            None => {
                seen.insert(assignment.sensor_id.clone(), assignment.id);
                kept.push(assignment);
            }
        }
    }

    (kept, issues)
}

fn build_reading(vendor: Option<&VendorReading>, battery_voltage: Option<f64>) -> SensorReading {
    match vendor {
        Some(r) => SensorReading {
            temperature: r.temperature,
            humidity: r.humidity,
            battery_voltage,
            present: true,
            timestamp: r.timestamp,
        },
        None => SensorReading::absent(),
    }
}
