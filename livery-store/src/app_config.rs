use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub auth: AuthConfig,
    pub tracking: TrackingConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

/// Knobs for the snapshot refresher and the driver position pipeline.
#[derive(Debug, Deserialize, Clone)]
pub struct TrackingConfig {
    /// Fallback poll cadence when no change notices arrive.
    pub poll_seconds: u64,
    /// Driver position sampling interval.
    #[serde(default = "default_report_seconds")]
    pub location_report_seconds: u64,
    /// Map rows older than this are flagged stale.
    #[serde(default = "default_stale_minutes")]
    pub location_stale_minutes: i64,
}

fn default_report_seconds() -> u64 {
    30
}

fn default_stale_minutes() -> i64 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    pub rate_limit_requests: i64,
    pub rate_limit_window_seconds: i64,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Per-environment file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Environment wins: LIVERY__SERVER__PORT=9090 etc.
            .add_source(config::Environment::with_prefix("LIVERY").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
