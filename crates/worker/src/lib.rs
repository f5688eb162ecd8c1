//! Cold-chain compliance worker.
//!
//! Runs the periodic sensor sweep and vendor device sync against PostgreSQL
//! and the vendor device API.

pub mod app;
pub mod config;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod vendor;
