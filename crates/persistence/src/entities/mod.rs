//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod alert;
pub mod gateway;
pub mod pharmacy;
pub mod sensor;
pub mod sensor_assignment;

pub use alert::{AlertEntity, AlertSeverityDb, AlertTypeDb};
pub use gateway::GatewayEntity;
pub use pharmacy::PharmacyEntity;
pub use sensor::SensorEntity;
pub use sensor_assignment::{LocationCategoryDb, SensorAssignmentEntity};
