//! Worker-level errors.

use domain::errors::{GatewayError, StoreError, SweepError, SyncError};
use thiserror::Error;

use crate::config::ConfigValidationError;

/// Errors surfaced by jobs and one-shot commands.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigValidationError),

    #[error("Sweep failed: {0}")]
    Sweep(#[from] SweepError),

    #[error("Device sync failed: {0}")]
    Sync(#[from] SyncError),

    #[error("Vendor client error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Metrics exporter error: {0}")]
    Metrics(String),
}
