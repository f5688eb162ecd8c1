use domain::services::KeywordAlias;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub vendor: VendorConfig,
    pub jobs: JobsConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json` or `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Vendor device API connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorConfig {
    /// Base URL of the vendor REST API (e.g. https://api.vendor.example/v1)
    pub base_url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_vendor_timeout_ms")]
    pub timeout_ms: u64,

    /// Sensor ids per latest-readings request
    #[serde(default = "default_reading_batch_size")]
    pub reading_batch_size: usize,
}

impl VendorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_minutes: u64,

    #[serde(default = "default_sync_interval")]
    pub sync_interval_minutes: u64,

    /// Lease length of the cross-process run lock
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_secs: u64,

    #[serde(default = "default_pool_metrics_interval")]
    pub pool_metrics_interval_secs: u64,

    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl JobsConfig {
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Legacy device naming aliases used by tenant inference.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InferenceConfig {
    #[serde(default)]
    pub aliases: Vec<KeywordAlias>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_addr")]
    pub listen_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: default_metrics_addr(),
        }
    }
}

// Default value functions
fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    2
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_vendor_timeout_ms() -> u64 {
    10_000
}
fn default_reading_batch_size() -> usize {
    100
}
fn default_sweep_interval() -> u64 {
    5
}
fn default_sync_interval() -> u64 {
    60
}
fn default_lock_ttl() -> u64 {
    600
}
fn default_pool_metrics_interval() -> u64 {
    30
}
fn default_shutdown_timeout() -> u64 {
    30
}
fn default_metrics_addr() -> String {
    "0.0.0.0:9100".to_string()
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with CC__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("CC").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds the config from embedded defaults plus overrides, without
    /// touching config files.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [database]
            url = ""
            max_connections = 10
            min_connections = 2
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [vendor]
            base_url = "http://localhost:8089"
            username = "test"
            password = "test"
            timeout_ms = 10000
            reading_batch_size = 100

            [jobs]
            sweep_interval_minutes = 5
            sync_interval_minutes = 60
            lock_ttl_secs = 600
            pool_metrics_interval_secs = 30
            shutdown_timeout_secs = 30

            [metrics]
            enabled = false
            listen_addr = "127.0.0.1:9100"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        // Validation is left to the caller so tests can build partial configs.
        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "CC__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.vendor.base_url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "CC__VENDOR__BASE_URL environment variable must be set".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.vendor.reading_batch_size == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "vendor.reading_batch_size must be greater than 0".to_string(),
            ));
        }

        if self.vendor.timeout_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "vendor.timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.jobs.sweep_interval_minutes == 0 || self.jobs.sync_interval_minutes == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "job intervals must be greater than 0".to_string(),
            ));
        }

        if self.metrics.enabled {
            self.metrics_addr()?;
        }

        Ok(())
    }

    pub fn metrics_addr(&self) -> Result<SocketAddr, ConfigValidationError> {
        self.metrics.listen_addr.parse().map_err(|_| {
            ConfigValidationError::InvalidValue(format!(
                "metrics.listen_addr '{}' is not a socket address",
                self.metrics.listen_addr
            ))
        })
    }
}
