//! Domain error types.
//!
//! Each layer of the engine has its own error enum. Store and gateway errors
//! are produced by the collaborators behind the traits in [`crate::services`];
//! the remaining variants describe how a sweep or sync pass fails as a whole.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by persistence collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Errors raised by the external device gateway (vendor API).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Vendor API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode vendor response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether the failure was a request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Timeout(_))
    }
}

/// Errors from the alert lifecycle manager.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Alert not found: {0}")]
    NotFound(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors that abort a device sync pass.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("Vendor gateway failure: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),
}

/// Errors that abort a sweep.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SweepError {
    #[error("Vendor gateway failure: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),
}
