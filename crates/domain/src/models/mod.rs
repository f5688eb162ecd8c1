//! Domain models for the cold-chain compliance core.

pub mod alert;
pub mod gateway;
pub mod pharmacy;
pub mod reading;
pub mod sensor;
pub mod sensor_assignment;

pub use alert::{Alert, AlertSeverity, AlertType, NewAlert, ResolveAlert, ResolveAlertRequest, SensorKey};
pub use gateway::{Gateway, GatewayUpdate, NewGateway};
pub use pharmacy::Pharmacy;
pub use reading::{SensorReading, SensorSnapshot};
pub use sensor::{NewSensor, Sensor, SensorUpdate};
pub use sensor_assignment::{
    CreateSensorAssignmentRequest, LocationCategory, SensorAssignment,
    UpdateSensorAssignmentRequest,
};
