//! The snapshot taken once per tick.

use chrono::NaiveDateTime;
use std::fmt;

/// SSID placeholder used when there is no associated network.
pub const SSID_NOT_AVAILABLE: &str = "N/A";

/// Closed classification of the wireless adapter's connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterState {
    Connected,
    Disconnected,
    Error,
    Unknown,
}

impl AdapterState {
    /// Map the free-form text reported by the OS onto the closed set.
    ///
    /// Accepts the English and Russian spellings netsh uses.
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "connected" | "подключено" => Self::Connected,
            "disconnected" | "отключено" => Self::Disconnected,
            "error" => Self::Error,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round-trip time of a single reachability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latency {
    /// Whole milliseconds.
    Measured(u32),
    Timeout,
}

impl Latency {
    pub fn millis(&self) -> Option<u32> {
        match self {
            Self::Measured(ms) => Some(*ms),
            Self::Timeout => None,
        }
    }
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measured(ms) => write!(f, "{}", ms),
            Self::Timeout => f.write_str("timeout"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternetStatus {
    Online,
    Offline,
}

impl InternetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for InternetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adapter fields returned by a single adapter probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterStatus {
    pub state: AdapterState,
    pub ssid: String,
    /// Signal quality in percent, `None` when not measured.
    pub signal_quality: Option<u8>,
}

impl AdapterStatus {
    /// Sentinel values reported when the adapter query itself fails.
    pub fn error() -> Self {
        Self {
            state: AdapterState::Error,
            ssid: SSID_NOT_AVAILABLE.to_string(),
            signal_quality: None,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            state: AdapterState::Disconnected,
            ssid: SSID_NOT_AVAILABLE.to_string(),
            signal_quality: None,
        }
    }
}

/// Immutable snapshot produced once per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub adapter_state: AdapterState,
    pub ssid: String,
    pub signal_quality: Option<u8>,
    pub latency: Latency,
}

impl Sample {
    pub fn new(timestamp: NaiveDateTime, adapter: AdapterStatus, latency: Latency) -> Self {
        Self {
            timestamp,
            adapter_state: adapter.state,
            ssid: adapter.ssid,
            signal_quality: adapter.signal_quality,
            latency,
        }
    }

    /// True iff the latency probe completed within its timeout.
    pub fn reachable(&self) -> bool {
        matches!(self.latency, Latency::Measured(_))
    }

    pub fn internet_status(&self) -> InternetStatus {
        if self.reachable() {
            InternetStatus::Online
        } else {
            InternetStatus::Offline
        }
    }

    /// Signal rendered with `-1` for "not measured".
    pub fn signal_display(&self) -> i32 {
        self.signal_quality.map_or(-1, i32::from)
    }

    /// Event body without the timestamp prefix.
    pub fn event_text(&self) -> String {
        format!(
            "Wi-Fi: {}, SSID: {}, Signal: {}%, Internet: {}, Ping: {} ms",
            self.adapter_state,
            self.ssid,
            self.signal_display(),
            self.internet_status(),
            self.latency,
        )
    }

    /// Line written to the event log.
    pub fn log_line(&self) -> String {
        format!(
            "[{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.event_text()
        )
    }

    /// Console line printed every tick.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] {:<12} {:<24} signal {:>3}%  internet {:<7}  ping {}",
            self.timestamp.format("%H:%M:%S"),
            self.adapter_state,
            self.ssid,
            self.signal_display(),
            self.internet_status(),
            match self.latency {
                Latency::Measured(ms) => format!("{} ms", ms),
                Latency::Timeout => "timeout".to_string(),
            }
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 3)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    pub(crate) fn sample(
        state: AdapterState,
        signal: Option<u8>,
        latency: Latency,
    ) -> Sample {
        let ssid = if state == AdapterState::Connected {
            "HomeNet".to_string()
        } else {
            SSID_NOT_AVAILABLE.to_string()
        };
        Sample {
            timestamp: at(12, 0, 0),
            adapter_state: state,
            ssid,
            signal_quality: signal,
            latency,
        }
    }

    #[test]
    fn test_reachable_follows_latency() {
        let online = sample(AdapterState::Connected, Some(80), Latency::Measured(0));
        assert!(online.reachable());
        assert_eq!(online.internet_status(), InternetStatus::Online);

        let offline = sample(AdapterState::Connected, Some(80), Latency::Timeout);
        assert!(!offline.reachable());
        assert_eq!(offline.internet_status(), InternetStatus::Offline);
    }

    #[test]
    fn test_classify_adapter_state() {
        assert_eq!(AdapterState::classify("connected"), AdapterState::Connected);
        assert_eq!(AdapterState::classify(" Disconnected "), AdapterState::Disconnected);
        assert_eq!(AdapterState::classify("error"), AdapterState::Error);
        assert_eq!(AdapterState::classify("Подключено"), AdapterState::Connected);
        assert_eq!(AdapterState::classify("отключено"), AdapterState::Disconnected);
        assert_eq!(AdapterState::classify("authenticating"), AdapterState::Unknown);
        assert_eq!(AdapterState::classify(""), AdapterState::Unknown);
    }

    #[test]
    fn test_log_line_format() {
        let mut s = sample(AdapterState::Connected, Some(99), Latency::Measured(23));
        s.ssid = "TestSSID".to_string();
        assert_eq!(
            s.log_line(),
            "[2025-07-03 12:00:00] Wi-Fi: connected, SSID: TestSSID, Signal: 99%, Internet: online, Ping: 23 ms"
        );

        let down = Sample::new(at(12, 0, 1), AdapterStatus::error(), Latency::Timeout);
        assert_eq!(
            down.log_line(),
            "[2025-07-03 12:00:01] Wi-Fi: error, SSID: N/A, Signal: -1%, Internet: offline, Ping: timeout ms"
        );
    }
}
