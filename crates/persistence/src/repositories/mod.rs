//! Repository implementations for database operations.

pub mod alert;
pub mod device_registry;
pub mod job_lock;
pub mod pharmacy;
pub mod sensor_assignment;

pub use alert::AlertRepository;
pub use device_registry::{DeviceRegistryRepository, GatewayRepository, SensorRepository};
pub use job_lock::JobLockRepository;
pub use pharmacy::PharmacyRepository;
pub use sensor_assignment::SensorAssignmentRepository;
