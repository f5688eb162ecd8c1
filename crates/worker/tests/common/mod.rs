//! Common fixtures for the worker integration tests.
//!
//! Everything runs against the in-memory store and the scriptable vendor
//! double, so no database or network is needed.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use coldchain_worker::jobs::{DeviceSyncJob, RunLock, SweepJob};
use domain::models::{LocationCategory, Pharmacy, SensorAssignment};
use domain::services::{
    AlertLifecycleManager, Clock, DeviceSyncReconciler, InMemoryStore, KeywordAlias, ManualClock,
    MockDeviceGateway, StaticThresholds, SweepConfig, SweepOrchestrator, TenantInferenceEngine,
};
use fake::faker::company::en::CompanyName;
use fake::Fake;
use uuid::Uuid;

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
}

/// A pharmacy with a random company name and the given short code.
pub fn pharmacy(code: &str) -> Pharmacy {
    let name: String = CompanyName().fake();
    Pharmacy::new(format!("{} Pharmacy", name), code)
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub vendor: Arc<MockDeviceGateway>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            vendor: Arc::new(MockDeviceGateway::new()),
            clock: Arc::new(ManualClock::new(start_time())),
        }
    }

    pub fn tenant(&self, code: &str) -> Pharmacy {
        let pharmacy = pharmacy(code);
        self.store.add_tenant(pharmacy.clone());
        pharmacy
    }

    /// Adds an active assignment, then ticks the clock so creation order is
    /// strict.
    pub fn assign(
        &self,
        sensor_id: &str,
        pharmacy_id: Uuid,
        category: LocationCategory,
    ) -> SensorAssignment {
        let now = self.clock.now();
        let assignment = SensorAssignment {
            id: Uuid::new_v4(),
            sensor_id: sensor_id.to_string(),
            pharmacy_id,
            location_category: category,
            label: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.store.add_assignment(assignment.clone());
        self.clock.advance(chrono::Duration::seconds(1));
        assignment
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.clock.advance(chrono::Duration::minutes(minutes));
    }

    pub fn orchestrator(&self, reading_batch_size: usize) -> SweepOrchestrator {
        SweepOrchestrator::new(
            self.store.clone(),
            AlertLifecycleManager::new(self.store.clone(), self.clock.clone()),
            self.vendor.clone(),
            self.store.clone(),
            Arc::new(StaticThresholds::new()),
            self.clock.clone(),
            SweepConfig { reading_batch_size },
        )
    }

    pub fn reconciler(&self, aliases: Vec<KeywordAlias>) -> DeviceSyncReconciler {
        DeviceSyncReconciler::new(
            self.vendor.clone(),
            self.store.clone(),
            self.store.clone(),
            TenantInferenceEngine::new(aliases),
            self.clock.clone(),
        )
    }

    pub fn run_lock(&self) -> RunLock {
        RunLock::new(self.store.clone(), Duration::from_secs(600))
    }

    pub fn sweep_job(&self) -> SweepJob {
        SweepJob::new(self.orchestrator(100), self.run_lock(), 5)
    }

    pub fn sync_job(&self) -> DeviceSyncJob {
        DeviceSyncJob::new(self.reconciler(Vec::new()), self.run_lock(), 60)
    }
}
