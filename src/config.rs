//! Configuration module for wifiwatch.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Monitor configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Pause between ticks (default: 1s)
    pub check_interval: Duration,
    /// Host probed for reachability (default: "8.8.8.8")
    pub ping_target_host: String,
    /// Timeout of a single ping (default: 1000ms)
    pub ping_timeout: Duration,
    /// Latency above this is always reported (default: 500)
    pub latency_threshold_ms: u32,
    /// Signal below this is always reported (default: 30)
    pub signal_threshold_percent: u8,
    /// Minimum signal change that counts as a transition (default: 5)
    pub signal_delta_percent: u8,
    /// Sleep after an unexpected tick failure (default: 5s)
    pub error_backoff: Duration,
    /// Path to the event log (default: "wifi_log.txt")
    pub log_path: PathBuf,
    /// Path to the structured store (default: "wifi_log.xlsx")
    pub store_path: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(1),
            ping_target_host: "8.8.8.8".to_string(),
            ping_timeout: Duration::from_millis(1000),
            latency_threshold_ms: 500,
            signal_threshold_percent: 30,
            signal_delta_percent: 5,
            error_backoff: Duration::from_secs(5),
            log_path: PathBuf::from("wifi_log.txt"),
            store_path: PathBuf::from("wifi_log.xlsx"),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables (all optional):
    /// - `WIFIWATCH_INTERVAL_SECS`: tick interval in seconds
    /// - `WIFIWATCH_PING_TARGET`: ping target host
    /// - `WIFIWATCH_PING_TIMEOUT_MS`: ping timeout in milliseconds
    /// - `WIFIWATCH_LATENCY_THRESHOLD_MS`: high-latency threshold
    /// - `WIFIWATCH_SIGNAL_THRESHOLD`: weak-signal threshold in percent
    /// - `WIFIWATCH_SIGNAL_DELTA`: signal change threshold in percent
    /// - `WIFIWATCH_ERROR_BACKOFF_SECS`: backoff after a failed tick
    /// - `WIFIWATCH_LOG_PATH`: event log file
    /// - `WIFIWATCH_STORE_PATH`: structured store file
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(secs) = parse_var::<u64, _>(&lookup, "WIFIWATCH_INTERVAL_SECS") {
            if secs > 0 {
                cfg.check_interval = Duration::from_secs(secs);
            }
        }

        if let Some(host) = lookup("WIFIWATCH_PING_TARGET") {
            if !host.trim().is_empty() {
                cfg.ping_target_host = host.trim().to_string();
            }
        }

        if let Some(ms) = parse_var::<u64, _>(&lookup, "WIFIWATCH_PING_TIMEOUT_MS") {
            if ms > 0 {
                cfg.ping_timeout = Duration::from_millis(ms);
            }
        }

        if let Some(ms) = parse_var(&lookup, "WIFIWATCH_LATENCY_THRESHOLD_MS") {
            cfg.latency_threshold_ms = ms;
        }

        if let Some(pct) = parse_var::<u8, _>(&lookup, "WIFIWATCH_SIGNAL_THRESHOLD") {
            cfg.signal_threshold_percent = pct.min(100);
        }

        if let Some(pct) = parse_var::<u8, _>(&lookup, "WIFIWATCH_SIGNAL_DELTA") {
            cfg.signal_delta_percent = pct.min(100);
        }

        if let Some(secs) = parse_var(&lookup, "WIFIWATCH_ERROR_BACKOFF_SECS") {
            cfg.error_backoff = Duration::from_secs(secs);
        }

        if let Some(path) = lookup("WIFIWATCH_LOG_PATH") {
            cfg.log_path = PathBuf::from(path);
        }

        if let Some(path) = lookup("WIFIWATCH_STORE_PATH") {
            cfg.store_path = PathBuf::from(path);
        }

        cfg
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}
