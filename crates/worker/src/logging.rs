//! Logging initialization and configuration.

use std::str::FromStr;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, for log shippers.
    Json,
    /// Multi-line human output.
    Pretty,
    /// Single-line human output, for one-shot runs in a terminal.
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" | "text" => Ok(LogFormat::Compact),
            other => Err(format!("Unknown log format: {}", other)),
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured level; an unknown format falls back to JSON.
pub fn init_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let parsed = config.format.parse::<LogFormat>();
    let format = parsed.clone().unwrap_or(LogFormat::Json);

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty().with_target(true)).init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false))
            .init(),
    }

    if parsed.is_err() {
        tracing::warn!(format = %config.format, "Unknown log format, using json");
    }
}
