//! In-memory implementations of the store and vendor traits.
//!
//! Used by unit and integration tests and for local dry runs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::{GatewayError, StoreError};
use crate::models::{
    Alert, CreateSensorAssignmentRequest, Gateway, GatewayUpdate, NewAlert, NewGateway,
    NewSensor, Pharmacy, ResolveAlert, Sensor, SensorAssignment, SensorSnapshot,
    SensorUpdate, UpdateSensorAssignmentRequest,
};
use crate::services::device_gateway::{DeviceGateway, VendorGateway, VendorReading, VendorSensor};
use crate::services::store::{AlertStore, AssignmentStore, DeviceRegistry, JobLock, TenantDirectory};

#[derive(Default)]
struct StoreState {
    tenants: Vec<Pharmacy>,
    assignments: Vec<SensorAssignment>,
    alerts: Vec<Alert>,
    gateways: Vec<Gateway>,
    sensors: Vec<Sensor>,
    locks: HashMap<String, (Uuid, Instant)>,
    failing_alert_sensors: HashSet<String>,
    failing_device_ids: HashSet<String>,
}

/// A single in-memory store implementing every persistence trait.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn add_tenant(&self, tenant: Pharmacy) {
        self.state().tenants.push(tenant);
    }

    pub fn add_assignment(&self, assignment: SensorAssignment) {
        self.state().assignments.push(assignment);
    }

    pub fn add_gateway(&self, gateway: Gateway) {
        self.state().gateways.push(gateway);
    }

    /// Every alert row, oldest first.
    pub fn all_alerts(&self) -> Vec<Alert> {
        let mut alerts = self.state().alerts.clone();
        alerts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        alerts
    }

    pub fn all_gateways(&self) -> Vec<Gateway> {
        self.state().gateways.clone()
    }

    pub fn all_sensors(&self) -> Vec<Sensor> {
        self.state().sensors.clone()
    }

    /// Inserts an alert bypassing the open-alert uniqueness check, for
    /// simulating legacy data.
    pub fn insert_alert_unchecked(&self, alert: NewAlert) -> Alert {
        let alert = build_alert(alert);
        self.state().alerts.push(alert.clone());
        alert
    }

    /// Makes every alert write for the given sensor fail.
    pub fn fail_alert_writes_for(&self, sensor_id: &str) {
        self.state().failing_alert_sensors.insert(sensor_id.to_string());
    }

    /// Makes inserts of the gateway or sensor with this external id fail.
    pub fn fail_device_writes_for(&self, external_id: &str) {
        self.state().failing_device_ids.insert(external_id.to_string());
    }

    fn check_alert_write(state: &StoreState, sensor_id: &str) -> Result<(), StoreError> {
        if state.failing_alert_sensors.contains(sensor_id) {
            return Err(StoreError::Database(format!(
                "simulated write failure for sensor {}",
                sensor_id
            )));
        }
        Ok(())
    }

    fn check_device_write(state: &StoreState, external_id: &str) -> Result<(), StoreError> {
        if state.failing_device_ids.contains(external_id) {
            return Err(StoreError::Database(format!(
                "simulated write failure for device {}",
                external_id
            )));
        }
        Ok(())
    }
}

fn build_alert(alert: NewAlert) -> Alert {
    Alert {
        id: Uuid::new_v4(),
        sensor_id: alert.sensor_id,
        pharmacy_id: alert.pharmacy_id,
        alert_type: alert.alert_type,
        severity: alert.severity,
        current_value: alert.current_value,
        threshold_value: alert.threshold_value,
        message: alert.message,
        resolved: false,
        created_at: alert.created_at,
        updated_at: alert.created_at,
        resolved_at: None,
        resolved_by: None,
        resolved_note: None,
    }
}

#[async_trait::async_trait]
impl AssignmentStore for InMemoryStore {
    async fn list_active_assignments(&self) -> Result<Vec<SensorAssignment>, StoreError> {
        Ok(self
            .state()
            .assignments
            .iter()
            .filter(|a| a.is_active)
            .cloned()
            .collect())
    }

    async fn find_assignment(&self, id: Uuid) -> Result<Option<SensorAssignment>, StoreError> {
        Ok(self.state().assignments.iter().find(|a| a.id == id).cloned())
    }

    async fn create_assignment(
        &self,
        request: &CreateSensorAssignmentRequest,
    ) -> Result<SensorAssignment, StoreError> {
        let mut state = self.state();
        if state
            .assignments
            .iter()
            .any(|a| a.sensor_id == request.sensor_id && a.pharmacy_id == request.pharmacy_id)
        {
            return Err(StoreError::Conflict(format!(
                "sensor {} already assigned to pharmacy {}",
                request.sensor_id, request.pharmacy_id
            )));
        }
        let now = Utc::now();
        let assignment = SensorAssignment {
            id: Uuid::new_v4(),
            sensor_id: request.sensor_id.clone(),
            pharmacy_id: request.pharmacy_id,
            location_category: request.location_category,
            label: request.label.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn reassign(
        &self,
        id: Uuid,
        request: &UpdateSensorAssignmentRequest,
    ) -> Result<SensorAssignment, StoreError> {
        let mut state = self.state();
        let assignment = state
            .assignments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("assignment {}", id)))?;
        if let Some(pharmacy_id) = request.pharmacy_id {
            assignment.pharmacy_id = pharmacy_id;
        }
        if let Some(category) = request.location_category {
            assignment.location_category = category;
        }
        if let Some(label) = &request.label {
            assignment.label = Some(label.clone());
        }
        if let Some(is_active) = request.is_active {
            assignment.is_active = is_active;
        }
        assignment.updated_at = Utc::now();
        Ok(assignment.clone())
    }

    async fn deactivate_assignment(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state();
        match state.assignments.iter_mut().find(|a| a.id == id && a.is_active) {
            Some(assignment) => {
                assignment.is_active = false;
                assignment.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait::async_trait]
impl AlertStore for InMemoryStore {
    async fn open_alerts_for_sensor(&self, sensor_id: &str) -> Result<Vec<Alert>, StoreError> {
        let mut open: Vec<Alert> = self
            .state()
            .alerts
            .iter()
            .filter(|a| !a.resolved && a.sensor_id == sensor_id)
            .cloned()
            .collect();
        open.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(open)
    }

    async fn create_alert(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        let mut state = self.state();
        Self::check_alert_write(&state, &alert.sensor_id)?;
        if state
            .alerts
            .iter()
            .any(|a| !a.resolved && a.sensor_id == alert.sensor_id && a.alert_type == alert.alert_type)
        {
            return Err(StoreError::Conflict(format!(
                "open {} alert already exists for sensor {}",
                alert.alert_type, alert.sensor_id
            )));
        }
        let alert = build_alert(alert);
        state.alerts.push(alert.clone());
        Ok(alert)
    }

    async fn refresh_alert(
        &self,
        id: Uuid,
        current_value: f64,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError> {
        let mut state = self.state();
        let sensor_id = state
            .alerts
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.sensor_id.clone())
            .ok_or_else(|| StoreError::NotFound(format!("alert {}", id)))?;
        Self::check_alert_write(&state, &sensor_id)?;
        let alert = state
            .alerts
            .iter_mut()
            .find(|a| a.id == id && !a.resolved)
            .ok_or_else(|| StoreError::NotFound(format!("open alert {}", id)))?;
        alert.current_value = current_value;
        alert.message = message.to_string();
        alert.updated_at = at;
        Ok(alert.clone())
    }

    async fn resolve_alert(&self, id: Uuid, resolution: ResolveAlert) -> Result<Alert, StoreError> {
        let mut state = self.state();
        let sensor_id = state
            .alerts
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.sensor_id.clone())
            .ok_or_else(|| StoreError::NotFound(format!("alert {}", id)))?;
        Self::check_alert_write(&state, &sensor_id)?;
        let alert = state
            .alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("alert {}", id)))?;
        if !alert.resolved {
            alert.resolved = true;
            alert.resolved_at = Some(resolution.resolved_at);
            alert.resolved_by = resolution.resolved_by;
            alert.resolved_note = resolution.note;
            alert.updated_at = resolution.resolved_at;
        }
        Ok(alert.clone())
    }

    async fn find_alert(&self, id: Uuid) -> Result<Option<Alert>, StoreError> {
        Ok(self.state().alerts.iter().find(|a| a.id == id).cloned())
    }

    async fn list_open_alerts(&self, pharmacy_id: Option<Uuid>) -> Result<Vec<Alert>, StoreError> {
        let mut open: Vec<Alert> = self
            .state()
            .alerts
            .iter()
            .filter(|a| !a.resolved && pharmacy_id.map_or(true, |p| a.pharmacy_id == p))
            .cloned()
            .collect();
        open.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(open)
    }
}

#[async_trait::async_trait]
impl DeviceRegistry for InMemoryStore {
    async fn find_gateway_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Gateway>, StoreError> {
        Ok(self
            .state()
            .gateways
            .iter()
            .find(|g| g.external_id == external_id)
            .cloned())
    }

    async fn list_gateways(&self) -> Result<Vec<Gateway>, StoreError> {
        Ok(self.state().gateways.clone())
    }

    async fn insert_gateway(&self, gateway: NewGateway) -> Result<Gateway, StoreError> {
        let mut state = self.state();
        Self::check_device_write(&state, &gateway.external_id)?;
        if state.gateways.iter().any(|g| g.external_id == gateway.external_id) {
            return Err(StoreError::Conflict(format!("gateway {}", gateway.external_id)));
        }
        let row = Gateway {
            id: Uuid::new_v4(),
            external_id: gateway.external_id,
            name: gateway.name,
            pharmacy_id: Some(gateway.pharmacy_id),
            paired: gateway.paired,
            last_seen_at: gateway.last_seen_at,
            created_at: gateway.now,
            updated_at: gateway.now,
        };
        state.gateways.push(row.clone());
        Ok(row)
    }

    async fn update_gateway(&self, id: Uuid, update: GatewayUpdate) -> Result<Gateway, StoreError> {
        let mut state = self.state();
        let gateway = state
            .gateways
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("gateway {}", id)))?;
        gateway.name = update.name;
        gateway.paired = update.paired;
        gateway.last_seen_at = update.last_seen_at.or(gateway.last_seen_at);
        if gateway.pharmacy_id.is_none() {
            gateway.pharmacy_id = update.pharmacy_id;
        }
        gateway.updated_at = update.now;
        Ok(gateway.clone())
    }

    async fn find_sensor_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Sensor>, StoreError> {
        Ok(self
            .state()
            .sensors
            .iter()
            .find(|s| s.external_id == external_id)
            .cloned())
    }

    async fn insert_sensor(&self, sensor: NewSensor) -> Result<Sensor, StoreError> {
        let mut state = self.state();
        Self::check_device_write(&state, &sensor.external_id)?;
        if state.sensors.iter().any(|s| s.external_id == sensor.external_id) {
            return Err(StoreError::Conflict(format!("sensor {}", sensor.external_id)));
        }
        if !state.gateways.iter().any(|g| g.id == sensor.gateway_id) {
            return Err(StoreError::NotFound(format!("gateway {}", sensor.gateway_id)));
        }
        let row = Sensor {
            id: Uuid::new_v4(),
            external_id: sensor.external_id,
            name: sensor.name,
            gateway_id: sensor.gateway_id,
            battery_voltage: sensor.battery_voltage,
            active: sensor.active,
            last_seen_at: sensor.last_seen_at,
            last_temperature: None,
            last_humidity: None,
            last_reading_at: None,
            created_at: sensor.now,
            updated_at: sensor.now,
        };
        state.sensors.push(row.clone());
        Ok(row)
    }

    async fn update_sensor(&self, id: Uuid, update: SensorUpdate) -> Result<Sensor, StoreError> {
        let mut state = self.state();
        let sensor = state
            .sensors
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("sensor {}", id)))?;
        sensor.name = update.name;
        sensor.battery_voltage = update.battery_voltage.or(sensor.battery_voltage);
        sensor.active = update.active;
        sensor.last_seen_at = update.last_seen_at.or(sensor.last_seen_at);
        sensor.updated_at = update.now;
        Ok(sensor.clone())
    }

    async fn record_sensor_snapshot(
        &self,
        external_id: &str,
        snapshot: SensorSnapshot,
    ) -> Result<bool, StoreError> {
        let mut state = self.state();
        match state.sensors.iter_mut().find(|s| s.external_id == external_id) {
            Some(sensor) => {
                sensor.last_temperature = snapshot.temperature;
                sensor.last_humidity = snapshot.humidity;
                sensor.last_reading_at = Some(snapshot.reading_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait::async_trait]
impl TenantDirectory for InMemoryStore {
    async fn list_tenants(&self) -> Result<Vec<Pharmacy>, StoreError> {
        Ok(self
            .state()
            .tenants
            .iter()
            .filter(|t| t.is_active)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl JobLock for InMemoryStore {
    async fn try_acquire(&self, job: &str, holder: Uuid, ttl: Duration) -> Result<bool, StoreError> {
        let mut state = self.state();
        let now = Instant::now();
        match state.locks.get(job) {
            Some((current, expires)) if *current != holder && *expires > now => Ok(false),
            _ => {
                state.locks.insert(job.to_string(), (holder, now + ttl));
                Ok(true)
            }
        }
    }

    async fn release(&self, job: &str, holder: Uuid) -> Result<(), StoreError> {
        let mut state = self.state();
        if matches!(state.locks.get(job), Some((current, _)) if *current == holder) {
            state.locks.remove(job);
        }
        Ok(())
    }
}

#[derive(Default)]
struct GatewayState {
    sensors: BTreeMap<String, VendorSensor>,
    gateways: BTreeMap<String, VendorGateway>,
    readings: BTreeMap<String, VendorReading>,
    auth_error: Option<GatewayError>,
    inventory_error: Option<GatewayError>,
    readings_error: Option<GatewayError>,
    timeout_ids: HashSet<String>,
}

/// Scriptable vendor API double.
#[derive(Default)]
pub struct MockDeviceGateway {
    state: Mutex<GatewayState>,
    auth_calls: AtomicUsize,
    reading_calls: AtomicUsize,
}

impl MockDeviceGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn add_sensor(&self, external_id: &str, name: &str, battery_voltage: Option<f64>) {
        self.state().sensors.insert(
            external_id.to_string(),
            VendorSensor {
                name: name.to_string(),
                battery_voltage,
                last_seen: Some(Utc::now()),
                active: true,
            },
        );
    }

    pub fn add_gateway(&self, external_id: &str, name: &str) {
        self.state().gateways.insert(
            external_id.to_string(),
            VendorGateway {
                name: name.to_string(),
                last_seen: Some(Utc::now()),
                paired: true,
            },
        );
    }

    pub fn set_reading(&self, sensor_id: &str, temperature: f64, humidity: Option<f64>) {
        self.state().readings.insert(
            sensor_id.to_string(),
            VendorReading {
                temperature: Some(temperature),
                humidity,
                timestamp: Some(Utc::now()),
            },
        );
    }

    pub fn remove_reading(&self, sensor_id: &str) {
        self.state().readings.remove(sensor_id);
    }

    pub fn fail_auth(&self, error: GatewayError) {
        self.state().auth_error = Some(error);
    }

    pub fn fail_inventory(&self, error: GatewayError) {
        self.state().inventory_error = Some(error);
    }

    pub fn fail_readings(&self, error: GatewayError) {
        self.state().readings_error = Some(error);
    }

    /// Any readings request that includes this id times out.
    pub fn time_out_on(&self, sensor_id: &str) {
        self.state().timeout_ids.insert(sensor_id.to_string());
    }

    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn reading_calls(&self) -> usize {
        self.reading_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DeviceGateway for MockDeviceGateway {
    async fn authenticate(&self) -> Result<(), GatewayError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        match &self.state().auth_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn list_sensors(&self) -> Result<BTreeMap<String, VendorSensor>, GatewayError> {
        let state = self.state();
        match &state.inventory_error {
            Some(e) => Err(e.clone()),
            None => Ok(state.sensors.clone()),
        }
    }

    async fn list_gateways(&self) -> Result<BTreeMap<String, VendorGateway>, GatewayError> {
        let state = self.state();
        match &state.inventory_error {
            Some(e) => Err(e.clone()),
            None => Ok(state.gateways.clone()),
        }
    }

    async fn latest_readings(
        &self,
        sensor_ids: &[String],
    ) -> Result<BTreeMap<String, VendorReading>, GatewayError> {
        self.reading_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        if let Some(e) = &state.readings_error {
            return Err(e.clone());
        }
        if sensor_ids.iter().any(|id| state.timeout_ids.contains(id)) {
            return Err(GatewayError::Timeout("latest readings".to_string()));
        }
        Ok(sensor_ids
            .iter()
            .filter_map(|id| state.readings.get(id).map(|r| (id.clone(), r.clone())))
            .collect())
    }
}
