//! Probe module for adapter and reachability queries.
//!
//! The monitor only sees the [`NetworkProbe`] trait. Every failure inside a
//! probe is folded into sentinel values before it reaches the caller.

mod adapter;
mod ping;

pub use adapter::*;
pub use ping::*;

use std::time::Duration;
use thiserror::Error;

use crate::sample::{AdapterStatus, Latency};

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("command failed: {0}")]
    Command(String),
    #[error("unrecognised output: {0}")]
    Parse(String),
}

/// Source of adapter state and internet latency.
#[allow(async_fn_in_trait)]
pub trait NetworkProbe {
    /// Query the wireless adapter. Failures come back as [`AdapterStatus::error`].
    async fn probe_adapter(&self) -> AdapterStatus;

    /// Send one reachability probe. Failures come back as [`Latency::Timeout`].
    async fn probe_latency(&self, host: &str, timeout: Duration) -> Latency;
}

/// Probe backed by the host operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl NetworkProbe for SystemProbe {
    async fn probe_adapter(&self) -> AdapterStatus {
        adapter_or_sentinel(query_adapter().await)
    }

    async fn probe_latency(&self, host: &str, timeout: Duration) -> Latency {
        latency_or_timeout(run_ping_probe(host, timeout).await, timeout)
    }
}

/// Fold an adapter query failure into the error sentinel.
pub fn adapter_or_sentinel(result: Result<AdapterStatus, ProbeError>) -> AdapterStatus {
    result.unwrap_or_else(|e| {
        tracing::warn!("Adapter probe failed: {}", e);
        AdapterStatus::error()
    })
}

/// Fold a ping failure into [`Latency::Timeout`].
pub fn latency_or_timeout(result: Result<Duration, ProbeError>, timeout: Duration) -> Latency {
    match result {
        Ok(elapsed) => latency_from_elapsed(elapsed, timeout),
        Err(ProbeError::Timeout(_)) => Latency::Timeout,
        Err(e) => {
            tracing::debug!("Ping failed: {}", e);
            Latency::Timeout
        }
    }
}

/// Convert a round trip into whole milliseconds, rounding up.
///
/// Replies that arrive at or after the timeout count as lost.
pub fn latency_from_elapsed(elapsed: Duration, timeout: Duration) -> Latency {
    if elapsed >= timeout {
        return Latency::Timeout;
    }
    let ms = elapsed.as_micros().div_ceil(1000);
    Latency::Measured(u32::try_from(ms).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_from_elapsed() {
        let timeout = Duration::from_millis(1000);
        assert_eq!(
            latency_from_elapsed(Duration::from_micros(12_300), timeout),
            Latency::Measured(13)
        );
        assert_eq!(
            latency_from_elapsed(Duration::from_micros(400), timeout),
            Latency::Measured(1)
        );
        assert_eq!(
            latency_from_elapsed(Duration::from_millis(42), timeout),
            Latency::Measured(42)
        );
        assert_eq!(latency_from_elapsed(timeout, timeout), Latency::Timeout);
    }

    #[test]
    fn test_adapter_failure_maps_to_sentinel() {
        let status = adapter_or_sentinel(Err(ProbeError::Command(
            "failed to execute netsh: not found".to_string(),
        )));
        assert_eq!(status.state, crate::sample::AdapterState::Error);
        assert_eq!(status.ssid, "N/A");
        assert_eq!(status.signal_quality, None);
    }

    #[test]
    fn test_ping_failure_maps_to_timeout() {
        let timeout = Duration::from_millis(1000);
        assert_eq!(
            latency_or_timeout(Err(ProbeError::Timeout(timeout)), timeout),
            Latency::Timeout
        );
        assert_eq!(
            latency_or_timeout(Err(ProbeError::Network("unreachable".into())), timeout),
            Latency::Timeout
        );
        assert_eq!(
            latency_or_timeout(Ok(Duration::from_millis(20)), timeout),
            Latency::Measured(20)
        );
    }
}
