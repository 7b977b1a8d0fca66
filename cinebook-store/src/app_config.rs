use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub booking_rules: BookingRules,
}

/// Tunables for the booking path.
#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    /// Window for instant-based showtime matching. One explicit value; the
    /// default policy is 60 seconds.
    #[serde(default = "default_tolerance_seconds")]
    pub showtime_match_tolerance_seconds: u64,
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: i64,
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_seconds: i64,
}

fn default_tolerance_seconds() -> u64 {
    60
}

fn default_rate_limit_requests() -> i64 {
    100
}

fn default_rate_limit_window() -> i64 {
    60
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            showtime_match_tolerance_seconds: default_tolerance_seconds(),
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_seconds: default_rate_limit_window(),
        }
    }
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

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("CINEBOOK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
