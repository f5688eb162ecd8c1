//! Domain services for the cold-chain engine.
//!
//! Services contain business logic that operates on domain models. I/O goes
//! through the traits in [`store`] and [`device_gateway`].

pub mod clock;
pub mod device_gateway;
pub mod device_sync;
pub mod evaluator;
pub mod inference;
pub mod lifecycle;
pub mod mock;
pub mod store;
pub mod sweep;
pub mod thresholds;

pub use clock::{Clock, ManualClock, SystemClock};

pub use device_gateway::{DeviceGateway, VendorGateway, VendorReading, VendorSensor};

pub use device_sync::{DeviceKind, DeviceSyncReconciler, SyncIssue, SyncIssueKind, SyncSummary};

pub use evaluator::{evaluate, temperature_severity, Evaluation, ViolationCandidate};

pub use inference::{
    FullNameMatcher, Inference, KeywordAlias, KeywordAliasMatcher, ShortCodeMatcher,
    TenantInferenceEngine, TenantMatcher,
};

pub use lifecycle::{
    AlertLifecycleManager, ReconcileOutcome, ResolveOutcome, AUTO_RESOLVE_NOTE,
    DUPLICATE_RESOLVE_NOTE, REASSIGNED_RESOLVE_NOTE,
};

pub use mock::{InMemoryStore, MockDeviceGateway};

pub use store::{AlertStore, AssignmentStore, DeviceRegistry, JobLock, TenantDirectory};

pub use sweep::{SweepConfig, SweepIssue, SweepIssueKind, SweepOrchestrator, SweepSummary};

pub use thresholds::{StaticThresholds, ThresholdProfile, ThresholdSource};
