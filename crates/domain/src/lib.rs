//! Domain layer for the cold-chain compliance core.
//!
//! This crate contains:
//! - Domain models (SensorAssignment, Gateway, Sensor, Alert, Pharmacy)
//! - The alert engine: thresholds, evaluation and lifecycle reconciliation
//! - Tenant inference and vendor inventory sync
//! - Store and vendor traits plus in-memory doubles
//! - Domain error types

pub mod errors;
pub mod models;
pub mod services;
