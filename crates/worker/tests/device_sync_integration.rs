//! Integration tests for vendor device sync.
//!
//! Run with: cargo test --test device_sync_integration

mod common;

use chrono::Utc;
use common::Harness;
use domain::errors::GatewayError;
use domain::models::{Gateway, LocationCategory};
use domain::services::{DeviceKind, KeywordAlias, SyncIssueKind};
use uuid::Uuid;

// ============================================================================
// Inventory mirroring
// ============================================================================

#[tokio::test]
async fn test_sync_then_sweep_records_snapshot() {
    let h = Harness::new();
    let downtown = h.tenant("DT01");
    h.vendor.add_gateway("GW-1", "DT01 main hub");
    h.vendor.add_sensor("SN-1", "GW-1 fridge probe", Some(3.1));

    let summary = h.reconciler(Vec::new()).sync().await.unwrap();
    assert_eq!(summary.gateways_created, 1);
    assert_eq!(summary.sensors_created, 1);

    let gateway = &h.store.all_gateways()[0];
    assert_eq!(gateway.pharmacy_id, Some(downtown.id));
    let sensor = &h.store.all_sensors()[0];
    assert_eq!(sensor.gateway_id, gateway.id);
    assert_eq!(sensor.battery_voltage, Some(3.1));

    h.assign("SN-1", downtown.id, LocationCategory::Refrigerator);
    h.vendor.set_reading("SN-1", 4.2, Some(40.0));
    h.orchestrator(100).run_sweep().await.unwrap();

    let sensor = &h.store.all_sensors()[0];
    assert_eq!(sensor.last_temperature, Some(4.2));
    assert_eq!(sensor.last_humidity, Some(40.0));
    assert!(sensor.last_reading_at.is_some());
}

#[tokio::test]
async fn test_repeated_sync_is_idempotent() {
    let h = Harness::new();
    h.tenant("DT01");
    h.tenant("RVS");
    h.vendor.add_gateway("GW-1", "DT01 main hub");
    h.vendor.add_gateway("GW-2", "RVS back office");
    h.vendor.add_sensor("SN-1", "GW-1 fridge", None);
    h.vendor.add_sensor("SN-2", "GW-2 shelf", Some(2.9));
    let reconciler = h.reconciler(Vec::new());

    let first = reconciler.sync().await.unwrap();
    assert_eq!(first.created(), 4);

    h.advance_minutes(60);
    let second = reconciler.sync().await.unwrap();
    assert_eq!(second.created(), 0);
    assert_eq!(second.updated(), 4);
    assert!(second.issues.is_empty());
    assert_eq!(h.store.all_gateways().len(), 2);
    assert_eq!(h.store.all_sensors().len(), 2);
}

#[tokio::test]
async fn test_keyword_alias_resolves_legacy_names() {
    let h = Harness::new();
    let old_town = h.tenant("OT");
    h.vendor.add_gateway("GW-7", "Old Town cellar");

    let aliases = vec![KeywordAlias::new("old town", "ot")];
    let summary = h.reconciler(aliases).sync().await.unwrap();

    assert_eq!(summary.gateways_created, 1);
    assert_eq!(h.store.all_gateways()[0].pharmacy_id, Some(old_town.id));
}

// ============================================================================
// Unresolved devices and ownership
// ============================================================================

#[tokio::test]
async fn test_unresolved_devices_are_reported_not_created() {
    let h = Harness::new();
    h.tenant("DT01");
    h.vendor.add_gateway("GW-9", "Warehouse hub");
    h.vendor.add_sensor("SN-9", "loose probe", None);

    let summary = h.reconciler(Vec::new()).sync().await.unwrap();

    assert_eq!(summary.created(), 0);
    assert_eq!(summary.issues.len(), 2);
    let gateway_issue = summary
        .issues
        .iter()
        .find(|i| i.device == DeviceKind::Gateway)
        .unwrap();
    assert_eq!(gateway_issue.kind, SyncIssueKind::UnresolvedTenant);
    assert_eq!(gateway_issue.external_id, "GW-9");
    let sensor_issue = summary
        .issues
        .iter()
        .find(|i| i.device == DeviceKind::Sensor)
        .unwrap();
    assert_eq!(sensor_issue.kind, SyncIssueKind::UnresolvedGateway);
    assert!(h.store.all_gateways().is_empty());
    assert!(h.store.all_sensors().is_empty());
}

#[tokio::test]
async fn test_existing_gateway_owner_is_kept() {
    let h = Harness::new();
    h.tenant("DT01");
    let riverside = h.tenant("RVS");
    let now = Utc::now();
    h.store.add_gateway(Gateway {
        id: Uuid::new_v4(),
        external_id: "GW-1".into(),
        name: "old name".into(),
        pharmacy_id: Some(riverside.id),
        paired: false,
        last_seen_at: None,
        created_at: now,
        updated_at: now,
    });
    // Renamed on the vendor side to something that looks like DT01.
    h.vendor.add_gateway("GW-1", "DT01 hub");

    let summary = h.reconciler(Vec::new()).sync().await.unwrap();

    assert_eq!(summary.gateways_updated, 1);
    let gateway = &h.store.all_gateways()[0];
    assert_eq!(gateway.pharmacy_id, Some(riverside.id));
    assert_eq!(gateway.name, "DT01 hub");
    assert!(gateway.paired);
}

#[tokio::test]
async fn test_unowned_gateway_gets_pharmacy_once_inferable() {
    let h = Harness::new();
    let downtown = h.tenant("DT01");
    let now = Utc::now();
    h.store.add_gateway(Gateway {
        id: Uuid::new_v4(),
        external_id: "GW-3".into(),
        name: "hub".into(),
        pharmacy_id: None,
        paired: true,
        last_seen_at: None,
        created_at: now,
        updated_at: now,
    });
    h.vendor.add_gateway("GW-3", "DT01 hub");

    h.reconciler(Vec::new()).sync().await.unwrap();

    assert_eq!(h.store.all_gateways()[0].pharmacy_id, Some(downtown.id));
}

#[tokio::test]
async fn test_failed_insert_is_an_issue_not_an_abort() {
    let h = Harness::new();
    h.tenant("DT01");
    h.vendor.add_gateway("GW-1", "DT01 hub");
    h.vendor.add_gateway("GW-2", "DT01 annex hub");
    h.store.fail_device_writes_for("GW-1");

    let summary = h.reconciler(Vec::new()).sync().await.unwrap();

    assert_eq!(summary.gateways_created, 1);
    assert_eq!(summary.issues.len(), 1);
    assert_eq!(summary.issues[0].kind, SyncIssueKind::Store);
    assert_eq!(summary.issues[0].external_id, "GW-1");
}

// ============================================================================
// Job wrapper
// ============================================================================

#[tokio::test]
async fn test_sync_job_summary_serializes_camel_case() {
    let h = Harness::new();
    h.tenant("DT01");
    h.vendor.add_gateway("GW-1", "DT01 hub");

    let summary = h.sync_job().run_once().await.unwrap().unwrap();
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["gatewaysCreated"], 1);
    assert_eq!(json["sensorsCreated"], 0);
    assert!(json["issues"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_job_propagates_auth_failure() {
    let h = Harness::new();
    h.vendor.fail_auth(GatewayError::Auth("expired password".into()));

    let err = h.sync_job().run_once().await.unwrap_err();
    assert!(err.to_string().contains("expired password"));
}
