use std::path::PathBuf;
use std::time::Duration;

use crate::orders::policy::{
    DEFAULT_SETTLEMENT_BACKOFF_MS, DEFAULT_SETTLEMENT_MAX_RETRIES, DispatchPolicy,
};

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./work_dir | database and log directory |
/// | HTTP_PORT | 3000 | HTTP port |
/// | ENVIRONMENT | development | development / staging / production |
/// | LOG_LEVEL | info | tracing filter |
/// | LOG_JSON | false | JSON console output |
/// | LOG_TO_FILE | false | write `WORK_DIR/logs` |
/// | REQUEST_TIMEOUT_MS | 30000 | per-request timeout |
/// | SETTLEMENT_MAX_RETRIES | 5 | retries for a failed delivery commit |
/// | SETTLEMENT_BACKOFF_MS | 50 | first retry backoff, doubled each time |
/// | REJECT_COOLDOWN_SECS | 0 | 0 disables the cooldown |
/// | PENDING_EXPIRY_SECS | 0 | 0 never expires pending orders |
/// | ASSIGNED_EXPIRY_SECS | 0 | 0 never expires assigned orders |
/// | SWEEP_INTERVAL_SECS | 60 | stale order sweeper tick |
///
/// ```ignore
/// WORK_DIR=/data/dispatch HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub http_port: u16,
    /// development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_to_file: bool,
    pub request_timeout_ms: u64,

    // === Dispatch policy ===
    pub settlement_max_retries: u32,
    pub settlement_backoff_ms: u64,
    pub reject_cooldown_secs: u64,
    pub pending_expiry_secs: u64,
    pub assigned_expiry_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable variables fall back to their defaults.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./work_dir".into()),
            http_port: env_parse("HTTP_PORT", 3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_parse("LOG_JSON", false),
            log_to_file: env_parse("LOG_TO_FILE", false),
            request_timeout_ms: env_parse("REQUEST_TIMEOUT_MS", 30000),

            settlement_max_retries: env_parse(
                "SETTLEMENT_MAX_RETRIES",
                DEFAULT_SETTLEMENT_MAX_RETRIES,
            ),
            settlement_backoff_ms: env_parse("SETTLEMENT_BACKOFF_MS", DEFAULT_SETTLEMENT_BACKOFF_MS),
            reject_cooldown_secs: env_parse("REJECT_COOLDOWN_SECS", 0),
            pending_expiry_secs: env_parse("PENDING_EXPIRY_SECS", 0),
            assigned_expiry_secs: env_parse("ASSIGNED_EXPIRY_SECS", 0),
            sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS", 60),
        }
    }

    /// Override the work directory and port (tests)
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("dispatch.redb")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Sweeper tick, never zero
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn dispatch_policy(&self) -> DispatchPolicy {
        DispatchPolicy::from_secs(
            self.reject_cooldown_secs,
            self.pending_expiry_secs,
            self.assigned_expiry_secs,
        )
        .with_settlement_retries(self.settlement_max_retries, self.settlement_backoff_ms)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
