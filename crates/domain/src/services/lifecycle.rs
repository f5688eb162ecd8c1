//! Alert lifecycle manager.
//!
//! Turns violation candidates into persisted alert state while keeping at
//! most one open alert per (sensor, alert type). The manager owns each alert
//! row for the duration of a `reconcile` call; callers must not run two
//! reconciles for the same sensor concurrently (sweeps hold a run lock).

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{LifecycleError, StoreError};
use crate::models::{Alert, AlertType, NewAlert, ResolveAlert, ResolveAlertRequest, SensorKey};
use crate::services::clock::Clock;
use crate::services::evaluator::{Evaluation, ViolationCandidate};
use crate::services::store::AlertStore;

pub const AUTO_RESOLVE_NOTE: &str = "Auto-resolved: back in range";
pub const DUPLICATE_RESOLVE_NOTE: &str = "Auto-resolved: duplicate";
pub const REASSIGNED_RESOLVE_NOTE: &str = "Auto-resolved: sensor reassigned";

/// Counts of alert transitions produced by one reconcile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub created: usize,
    pub refreshed: usize,
    pub resolved: usize,
}

impl ReconcileOutcome {
    pub fn merge(&mut self, other: ReconcileOutcome) {
        self.created += other.created;
        self.refreshed += other.refreshed;
        self.resolved += other.resolved;
    }
}

/// Result of a manual resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    Resolved(Alert),
    AlreadyResolved(Alert),
}

impl ResolveOutcome {
    pub fn alert(&self) -> &Alert {
        match self {
            ResolveOutcome::Resolved(a) | ResolveOutcome::AlreadyResolved(a) => a,
        }
    }
}

pub struct AlertLifecycleManager {
    store: Arc<dyn AlertStore>,
    clock: Arc<dyn Clock>,
}

impl AlertLifecycleManager {
    pub fn new(store: Arc<dyn AlertStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Applies one evaluation to the sensor's open alerts.
    ///
    /// Candidates refresh a matching open alert or create a new one. Open
    /// alerts of a checked type without a candidate are auto-resolved. An
    /// offline evaluation only checks `offline`, so other alerts are left
    /// untouched until the sensor reports again.
    ///
    /// Open alerts still held by another pharmacy are resolved first: the
    /// sensor was reassigned and its current owner starts from a clean slate.
    pub async fn reconcile(
        &self,
        key: &SensorKey,
        evaluation: &Evaluation,
    ) -> Result<ReconcileOutcome, StoreError> {
        let now = self.clock.now();
        let mut outcome = ReconcileOutcome::default();

        let mut open = self.store.open_alerts_for_sensor(&key.sensor_id).await?;
        open.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut by_type: BTreeMap<AlertType, Alert> = BTreeMap::new();
        for alert in open {
            if alert.pharmacy_id != key.pharmacy_id {
                info!(
                    sensor = %key,
                    alert_id = %alert.id,
                    alert_type = %alert.alert_type,
                    previous_pharmacy = %alert.pharmacy_id,
                    "Resolving alert held by previous pharmacy"
                );
                self.store
                    .resolve_alert(
                        alert.id,
                        ResolveAlert {
                            resolved_at: now,
                            resolved_by: None,
                            note: Some(REASSIGNED_RESOLVE_NOTE.to_string()),
                        },
                    )
                    .await?;
                outcome.resolved += 1;
                continue;
            }
            match by_type.entry(alert.alert_type) {
                Entry::Vacant(slot) => {
                    slot.insert(alert);
                }
                Entry::Occupied(_) => {
                    warn!(
                        sensor = %key,
                        alert_id = %alert.id,
                        alert_type = %alert.alert_type,
                        "Duplicate open alert found, resolving older row"
                    );
                    self.store
                        .resolve_alert(
                            alert.id,
                            ResolveAlert {
                                resolved_at: now,
                                resolved_by: None,
                                note: Some(DUPLICATE_RESOLVE_NOTE.to_string()),
                            },
                        )
                        .await?;
                    outcome.resolved += 1;
                }
            }
        }

        for candidate in &evaluation.candidates {
            let existing_id = by_type.get(&candidate.alert_type).map(|a| a.id);
            match existing_id {
                Some(existing_id) => {
                    let refreshed = self
                        .store
                        .refresh_alert(existing_id, candidate.current_value, &candidate.message, now)
                        .await?;
                    debug!(
                        sensor = %key,
                        alert_id = %refreshed.id,
                        alert_type = %candidate.alert_type,
                        value = candidate.current_value,
                        "Alert refreshed"
                    );
                    by_type.insert(candidate.alert_type, refreshed);
                    outcome.refreshed += 1;
                }
                None => {
                    let (alert, created) = self.open_alert(key, candidate).await?;
                    if created {
                        outcome.created += 1;
                    } else {
                        outcome.refreshed += 1;
                    }
                    by_type.insert(candidate.alert_type, alert);
                }
            }
        }

        for (alert_type, alert) in &by_type {
            if !evaluation.is_checked(*alert_type) || evaluation.has_candidate(*alert_type) {
                continue;
            }
            self.store
                .resolve_alert(
                    alert.id,
                    ResolveAlert {
                        resolved_at: now,
                        resolved_by: None,
                        note: Some(AUTO_RESOLVE_NOTE.to_string()),
                    },
                )
                .await?;
            info!(
                sensor = %key,
                alert_id = %alert.id,
                alert_type = %alert_type,
                "Alert auto-resolved"
            );
            outcome.resolved += 1;
        }

        Ok(outcome)
    }

    /// Creates an alert for a candidate. If a concurrent writer opened the
    /// same type first, refreshes that row instead. Returns whether a row
    /// was created.
    async fn open_alert(
        &self,
        key: &SensorKey,
        candidate: &ViolationCandidate,
    ) -> Result<(Alert, bool), StoreError> {
        let now = self.clock.now();
        let new_alert = NewAlert {
            sensor_id: key.sensor_id.clone(),
            pharmacy_id: key.pharmacy_id,
            alert_type: candidate.alert_type,
            severity: candidate.severity,
            current_value: candidate.current_value,
            threshold_value: candidate.threshold_value,
            message: candidate.message.clone(),
            created_at: now,
        };

        match self.store.create_alert(new_alert).await {
            Ok(alert) => {
                info!(
                    sensor = %key,
                    alert_id = %alert.id,
                    alert_type = %alert.alert_type,
                    severity = %alert.severity,
                    value = alert.current_value,
                    threshold = alert.threshold_value,
                    "Alert created"
                );
                Ok((alert, true))
            }
            Err(StoreError::Conflict(msg)) => {
                let winner = self
                    .store
                    .open_alerts_for_sensor(&key.sensor_id)
                    .await?
                    .into_iter()
                    .find(|a| a.alert_type == candidate.alert_type)
                    .ok_or(StoreError::Conflict(msg))?;
                let refreshed = self
                    .store
                    .refresh_alert(winner.id, candidate.current_value, &candidate.message, now)
                    .await?;
                Ok((refreshed, false))
            }
            Err(e) => Err(e),
        }
    }

    /// Manually resolves an alert on behalf of an operator.
    ///
    /// Idempotent: an alert that is already resolved is returned unchanged.
    pub async fn resolve(
        &self,
        alert_id: Uuid,
        operator_id: Uuid,
        request: ResolveAlertRequest,
    ) -> Result<ResolveOutcome, LifecycleError> {
        request
            .validate()
            .map_err(|e| LifecycleError::Validation(e.to_string()))?;

        let alert = self
            .store
            .find_alert(alert_id)
            .await?
            .ok_or(LifecycleError::NotFound(alert_id))?;

        if alert.resolved {
            return Ok(ResolveOutcome::AlreadyResolved(alert));
        }

        let resolved = self
            .store
            .resolve_alert(
                alert_id,
                ResolveAlert {
                    resolved_at: self.clock.now(),
                    resolved_by: Some(operator_id),
                    note: request.note,
                },
            )
            .await?;

        info!(
            alert_id = %alert_id,
            operator_id = %operator_id,
            alert_type = %resolved.alert_type,
            "Alert resolved manually"
        );

        Ok(ResolveOutcome::Resolved(resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertSeverity, SensorReading};
    use crate::services::clock::ManualClock;
    use crate::services::evaluator::evaluate;
    use crate::services::mock::InMemoryStore;
    use crate::services::thresholds::ThresholdProfile;
    use chrono::{Duration, TimeZone, Utc};

    struct Harness {
        store: Arc<InMemoryStore>,
        clock: Arc<ManualClock>,
        manager: AlertLifecycleManager,
        key: SensorKey,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ));
        let manager = AlertLifecycleManager::new(store.clone(), clock.clone());
        Harness {
            store,
            clock,
            manager,
            key: SensorKey::new("SN-100", Uuid::new_v4()),
        }
    }

    fn note(text: &str) -> ResolveAlertRequest {
        ResolveAlertRequest {
            note: Some(text.to_string()),
        }
    }

    fn fridge(reading: SensorReading) -> Evaluation {
        evaluate(&reading, &ThresholdProfile::REFRIGERATOR)
    }

    #[tokio::test]
    async fn test_creates_alert_on_first_violation() {
        let h = harness();
        let outcome = h
            .manager
            .reconcile(&h.key, &fridge(SensorReading::with_temperature(9.5)))
            .await
            .unwrap();

        assert_eq!(outcome.created, 1);
        let open = h.store.open_alerts_for_sensor(&h.key.sensor_id).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].alert_type, AlertType::TemperatureHigh);
        assert_eq!(open[0].severity, AlertSeverity::Medium);
        assert_eq!(open[0].current_value, 9.5);
        assert_eq!(open[0].threshold_value, 8.0);
    }

    #[tokio::test]
    async fn test_repeated_violation_refreshes_without_changing_severity() {
        let h = harness();
        h.manager
            .reconcile(&h.key, &fridge(SensorReading::with_temperature(9.5)))
            .await
            .unwrap();

        h.clock.advance(Duration::minutes(5));
        let outcome = h
            .manager
            .reconcile(&h.key, &fridge(SensorReading::with_temperature(15.0)))
            .await
            .unwrap();

        assert_eq!(outcome.created, 0);
        assert_eq!(outcome.refreshed, 1);

        let all = h.store.all_alerts();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].current_value, 15.0);
        assert_eq!(all[0].severity, AlertSeverity::Medium);
        assert_eq!(all[0].updated_at, h.clock.now());
    }

    #[tokio::test]
    async fn test_back_in_range_auto_resolves() {
        let h = harness();
        h.manager
            .reconcile(&h.key, &fridge(SensorReading::with_temperature(9.5)))
            .await
            .unwrap();

        h.clock.advance(Duration::minutes(5));
        let outcome = h
            .manager
            .reconcile(&h.key, &fridge(SensorReading::with_temperature(5.0)))
            .await
            .unwrap();

        assert_eq!(outcome.resolved, 1);
        assert_eq!(outcome.created, 0);
        let all = h.store.all_alerts();
        assert_eq!(all.len(), 1);
        assert!(all[0].resolved);
        assert_eq!(all[0].resolved_at, Some(h.clock.now()));
        assert_eq!(all[0].resolved_note.as_deref(), Some(AUTO_RESOLVE_NOTE));
        assert!(all[0].resolved_by.is_none());
    }

    #[tokio::test]
    async fn test_offline_pass_leaves_other_alerts_open() {
        let h = harness();
        h.manager
            .reconcile(
                &h.key,
                &fridge(SensorReading::with_temperature(12.0).battery(2.0)),
            )
            .await
            .unwrap();

        let outcome = h
            .manager
            .reconcile(&h.key, &fridge(SensorReading::absent()))
            .await
            .unwrap();

        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.resolved, 0);
        let open = h.store.open_alerts_for_sensor(&h.key.sensor_id).await.unwrap();
        let mut types: Vec<_> = open.iter().map(|a| a.alert_type).collect();
        types.sort();
        assert_eq!(
            types,
            vec![
                AlertType::TemperatureHigh,
                AlertType::BatteryLow,
                AlertType::Offline
            ]
        );
    }

    #[tokio::test]
    async fn test_sensor_back_online_resolves_offline() {
        let h = harness();
        h.manager
            .reconcile(&h.key, &fridge(SensorReading::absent()))
            .await
            .unwrap();

        let outcome = h
            .manager
            .reconcile(&h.key, &fridge(SensorReading::with_temperature(4.0)))
            .await
            .unwrap();

        assert_eq!(outcome.resolved, 1);
        assert!(h.store.open_alerts_for_sensor(&h.key.sensor_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_new_violation_after_resolution_creates_new_row() {
        let h = harness();
        for temp in [9.5, 5.0, 10.0] {
            h.manager
                .reconcile(&h.key, &fridge(SensorReading::with_temperature(temp)))
                .await
                .unwrap();
            h.clock.advance(Duration::minutes(5));
        }

        let all = h.store.all_alerts();
        assert_eq!(all.len(), 2);
        assert_eq!(all.iter().filter(|a| a.resolved).count(), 1);
        assert_eq!(all.iter().filter(|a| !a.resolved).count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_open_rows_are_healed() {
        let h = harness();
        let now = h.clock.now();
        for offset in [0, 1] {
            h.store.insert_alert_unchecked(NewAlert {
                sensor_id: h.key.sensor_id.clone(),
                pharmacy_id: h.key.pharmacy_id,
                alert_type: AlertType::TemperatureHigh,
                severity: AlertSeverity::Low,
                current_value: 8.5,
                threshold_value: 8.0,
                message: "legacy".into(),
                created_at: now + Duration::seconds(offset),
            });
        }

        let outcome = h
            .manager
            .reconcile(&h.key, &fridge(SensorReading::with_temperature(9.0)))
            .await
            .unwrap();

        assert_eq!(outcome.resolved, 1);
        assert_eq!(outcome.refreshed, 1);
        let open = h.store.open_alerts_for_sensor(&h.key.sensor_id).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].current_value, 9.0);
    }

    #[tokio::test]
    async fn test_manual_resolve_is_idempotent() {
        let h = harness();
        h.manager
            .reconcile(&h.key, &fridge(SensorReading::with_temperature(20.0)))
            .await
            .unwrap();
        let alert_id = h.store.all_alerts()[0].id;
        let operator = Uuid::new_v4();

        let first = h
            .manager
            .resolve(alert_id, operator, note("Door closed"))
            .await
            .unwrap();
        assert!(matches!(first, ResolveOutcome::Resolved(_)));
        assert_eq!(first.alert().resolved_by, Some(operator));

        h.clock.advance(Duration::minutes(1));
        let second = h
            .manager
            .resolve(alert_id, Uuid::new_v4(), note("again"))
            .await
            .unwrap();
        match second {
            ResolveOutcome::AlreadyResolved(alert) => {
                assert_eq!(alert.resolved_by, Some(operator));
                assert_eq!(alert.resolved_note.as_deref(), Some("Door closed"));
            }
            other => panic!("expected AlreadyResolved, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_manual_resolve_unknown_alert() {
        let h = harness();
        let missing = Uuid::new_v4();
        let result = h
            .manager
            .resolve(missing, Uuid::new_v4(), ResolveAlertRequest { note: None })
            .await;
        assert_eq!(result, Err(LifecycleError::NotFound(missing)));
    }

    #[tokio::test]
    async fn test_manual_resolve_rejects_long_note() {
        let h = harness();
        h.manager
            .reconcile(&h.key, &fridge(SensorReading::with_temperature(20.0)))
            .await
            .unwrap();
        let alert_id = h.store.all_alerts()[0].id;

        let result = h
            .manager
            .resolve(alert_id, Uuid::new_v4(), note(&"n".repeat(501)))
            .await;

        assert!(matches!(result, Err(LifecycleError::Validation(_))));
        assert!(h.store.all_alerts()[0].is_open());
    }

    #[tokio::test]
    async fn test_reassigned_sensor_hands_over_open_alert() {
        let h = harness();
        h.manager
            .reconcile(&h.key, &fridge(SensorReading::with_temperature(12.0)))
            .await
            .unwrap();
        let previous_id = h.store.all_alerts()[0].id;

        let moved = SensorKey::new(h.key.sensor_id.clone(), Uuid::new_v4());
        h.clock.advance(Duration::minutes(5));
        let outcome = h
            .manager
            .reconcile(&moved, &fridge(SensorReading::with_temperature(12.0)))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome {
                created: 1,
                refreshed: 0,
                resolved: 1
            }
        );
        let previous = h.store.find_alert(previous_id).await.unwrap().unwrap();
        assert!(previous.resolved);
        assert_eq!(previous.resolved_note.as_deref(), Some(REASSIGNED_RESOLVE_NOTE));
        let open = h.store.open_alerts_for_sensor(&moved.sensor_id).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].pharmacy_id, moved.pharmacy_id);

        h.clock.advance(Duration::minutes(5));
        let outcome = h
            .manager
            .reconcile(&moved, &fridge(SensorReading::with_temperature(5.0)))
            .await
            .unwrap();
        assert_eq!(outcome.resolved, 1);
        assert!(h
            .store
            .open_alerts_for_sensor(&moved.sensor_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_persistent_violation_converges_to_one_row() {
        let h = harness();
        let mut total = ReconcileOutcome::default();
        for step in 0..6 {
            let temp = 9.0 + step as f64;
            total.merge(
                h.manager
                    .reconcile(&h.key, &fridge(SensorReading::with_temperature(temp)))
                    .await
                    .unwrap(),
            );
            h.clock.advance(Duration::minutes(5));
        }

        assert_eq!(total.created, 1);
        assert_eq!(total.refreshed, 5);
        assert_eq!(total.resolved, 0);
        let all = h.store.all_alerts();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].current_value, 14.0);
    }

    async fn assert_at_most_one_open_per_type(h: &Harness) -> Vec<AlertType> {
        let open = h
            .store
            .open_alerts_for_sensor(&h.key.sensor_id)
            .await
            .unwrap();
        for alert_type in AlertType::ALL {
            let count = open.iter().filter(|a| a.alert_type == alert_type).count();
            assert!(count <= 1, "{} open {} alerts", count, alert_type);
        }
        open.iter().map(|a| a.alert_type).collect()
    }

    #[tokio::test]
    async fn test_mixed_sequence_keeps_one_open_per_type() {
        let h = harness();
        let steps = [
            SensorReading::with_temperature(12.0).battery(2.0),
            SensorReading::absent(),
            SensorReading::with_temperature(13.0),
            SensorReading::absent(),
            SensorReading::with_temperature(5.0),
            SensorReading::with_temperature(9.5),
            SensorReading::absent(),
        ];

        for reading in steps {
            h.manager.reconcile(&h.key, &fridge(reading)).await.unwrap();
            assert_at_most_one_open_per_type(&h).await;
            h.clock.advance(Duration::minutes(5));
        }

        let open = assert_at_most_one_open_per_type(&h).await;
        assert!(open.contains(&AlertType::TemperatureHigh));
        assert!(open.contains(&AlertType::Offline));
        let temperature_rows = h
            .store
            .all_alerts()
            .into_iter()
            .filter(|a| a.alert_type == AlertType::TemperatureHigh)
            .count();
        assert_eq!(temperature_rows, 2);
    }
}
