//! # Controller Configuration
//!
//! Runtime tuning loaded from environment variables.

use crate::constants::{
    DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_WATCH_RESTART_DELAY_SECS,
};
use crate::observability::logging::LogFormat;
use std::time::Duration;

/// Runtime tuning knobs.
///
/// All settings have defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// First requeue delay after a retryable error (seconds)
    pub backoff_min_secs: u64,
    /// Largest requeue delay after repeated retryable errors (seconds)
    pub backoff_max_secs: u64,
    /// Delay before restarting a watch stream after an error (seconds)
    pub watch_restart_delay_secs: u64,
    /// Reconciles run concurrently per controller; 0 means unbounded
    pub max_concurrent_reconciliations: u16,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            max_concurrent_reconciliations: 0,
            log_filter: "origin_ca_issuer=info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backoff_min_secs: env_var_or_default("BACKOFF_MIN_SECS", defaults.backoff_min_secs),
            backoff_max_secs: env_var_or_default("BACKOFF_MAX_SECS", defaults.backoff_max_secs),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                defaults.watch_restart_delay_secs,
            ),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                defaults.max_concurrent_reconciliations,
            ),
            log_filter: env_var_or_default_str("LOG_FILTER", &defaults.log_filter),
            log_format: parse_log_format(&env_var_or_default_str("LOG_FORMAT", "text")),
        }
    }

    #[must_use]
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}

fn parse_log_format(value: &str) -> LogFormat {
    match value.trim().to_lowercase().as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
