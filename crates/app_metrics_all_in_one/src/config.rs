use common::telemetry::TelemetryConfig;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // HTTP configuration
    #[serde(default = "default_http_host")]
    pub http_host: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    // NATS configuration
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Subject carrying JSON-encoded telemetry events
    #[serde(default = "default_nats_events_subject")]
    pub nats_events_subject: String,

    /// Startup timeout for initialization operations in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    // Cloud Controller configuration
    #[serde(default = "default_cf_api_endpoint")]
    pub cf_api_endpoint: String,

    #[serde(default = "default_cf_uaa_endpoint")]
    pub cf_uaa_endpoint: String,

    #[serde(default = "default_cf_user")]
    pub cf_user: String,

    #[serde(default)]
    pub cf_password: String,

    #[serde(default)]
    pub cf_skip_ssl_validation: bool,

    /// Seconds between inventory reconciliation passes
    #[serde(default = "default_cf_pull_time_secs")]
    pub cf_pull_time_secs: u64,

    #[serde(default = "default_cf_request_timeout_secs")]
    pub cf_request_timeout_secs: u64,

    // Durable timestamp store
    /// Redis URL; empty keeps timestamps in memory only
    #[serde(default)]
    pub redis_url: String,

    #[serde(default = "default_durable_store_timeout_ms")]
    pub durable_store_timeout_ms: u64,

    // OpenTelemetry configuration
    /// OpenTelemetry OTLP endpoint (gRPC)
    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    /// Enable OpenTelemetry export
    #[serde(default)]
    pub otel_enabled: bool,

    /// Service name for OpenTelemetry resource
    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_nats_events_subject() -> String {
    "firehose.events".to_string()
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_cf_api_endpoint() -> String {
    "https://api.local.pcfdev.io".to_string()
}

fn default_cf_uaa_endpoint() -> String {
    "https://uaa.local.pcfdev.io".to_string()
}

fn default_cf_user() -> String {
    "admin".to_string()
}

fn default_cf_pull_time_secs() -> u64 {
    60
}

fn default_cf_request_timeout_secs() -> u64 {
    30
}

fn default_durable_store_timeout_ms() -> u64 {
    2000
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "app-metrics-nozzle".to_string()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::default())
            .build()?
            .try_deserialize()
    }
}

impl From<&ServiceConfig> for TelemetryConfig {
    fn from(config: &ServiceConfig) -> Self {
        let telemetry = TelemetryConfig::new(&config.otel_service_name, &config.log_level);
        if config.otel_enabled {
            telemetry.with_otlp_endpoint(&config.otel_endpoint)
        } else {
            telemetry
        }
    }
}
