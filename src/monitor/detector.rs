//! Decides which samples are worth persisting.

use std::fmt;

use crate::config::MonitorConfig;
use crate::sample::{AdapterState, InternetStatus, Sample};

/// Limits that make a sample reportable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Signal change (percent points) that counts as a transition.
    pub signal_delta: u8,
    /// Signal strictly below this is weak.
    pub weak_signal: u8,
    /// Latency strictly above this is slow.
    pub high_latency_ms: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

impl From<&MonitorConfig> for Thresholds {
    fn from(cfg: &MonitorConfig) -> Self {
        Self {
            signal_delta: cfg.signal_delta_percent,
            weak_signal: cfg.signal_threshold_percent,
            high_latency_ms: cfg.latency_threshold_ms,
        }
    }
}

/// Why a sample was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    AdapterChanged,
    InternetChanged,
    SignalShift,
    WeakSignal,
    Unreachable,
    HighLatency,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AdapterChanged => "adapter state changed",
            Self::InternetChanged => "internet status changed",
            Self::SignalShift => "signal shifted",
            Self::WeakSignal => "weak signal",
            Self::Unreachable => "unreachable",
            Self::HighLatency => "high latency",
        })
    }
}

/// What the previous tick observed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Observation {
    adapter_state: AdapterState,
    internet_status: InternetStatus,
    signal_quality: Option<u8>,
}

/// Classification of the most recent sample. Unset until the first tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorState {
    last: Option<Observation>,
}

impl MonitorState {
    pub fn last_adapter_state(&self) -> Option<AdapterState> {
        self.last.as_ref().map(|o| o.adapter_state)
    }

    pub fn last_internet_status(&self) -> Option<InternetStatus> {
        self.last.as_ref().map(|o| o.internet_status)
    }

    /// `None` before the first sample, `Some(None)` if the last signal was unmeasured.
    pub fn last_signal_quality(&self) -> Option<Option<u8>> {
        self.last.as_ref().map(|o| o.signal_quality)
    }

    fn record(&mut self, sample: &Sample) {
        self.last = Some(Observation {
            adapter_state: sample.adapter_state,
            internet_status: sample.internet_status(),
            signal_quality: sample.signal_quality,
        });
    }
}

/// Stateless rule set; the state it compares against lives in [`MonitorState`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector {
    thresholds: Thresholds,
}

impl ChangeDetector {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Decide whether `sample` is reportable, then record it in `state`.
    ///
    /// The state is updated whatever the outcome, so the next sample is
    /// compared with this one and not with the last reported one.
    pub fn classify(&self, sample: &Sample, state: &mut MonitorState) -> bool {
        let reasons = self.reasons(sample, state);
        if !reasons.is_empty() {
            tracing::debug!(
                "Reportable: {}",
                reasons
                    .iter()
                    .map(Reason::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        state.record(sample);
        !reasons.is_empty()
    }

    /// Every rule that `sample` trips against `state`.
    pub fn reasons(&self, sample: &Sample, state: &MonitorState) -> Vec<Reason> {
        let t = &self.thresholds;
        let mut reasons = Vec::new();

        if state.last_adapter_state() != Some(sample.adapter_state) {
            reasons.push(Reason::AdapterChanged);
        }

        if state.last_internet_status() != Some(sample.internet_status()) {
            reasons.push(Reason::InternetChanged);
        }

        if let Some(last_signal) = state.last_signal_quality() {
            if signal_delta(sample.signal_quality, last_signal) >= t.signal_delta {
                reasons.push(Reason::SignalShift);
            }
        }

        // An unmeasured signal counts as weak
        if sample.signal_quality.map_or(true, |s| s < t.weak_signal) {
            reasons.push(Reason::WeakSignal);
        }

        match sample.latency.millis() {
            None => reasons.push(Reason::Unreachable),
            Some(ms) if ms > t.high_latency_ms => reasons.push(Reason::HighLatency),
            Some(_) => {}
        }

        reasons
    }
}

/// Absolute change between two readings. Gaining or losing a measurement
/// is a maximal change.
fn signal_delta(current: Option<u8>, last: Option<u8>) -> u8 {
    match (current, last) {
        (Some(a), Some(b)) => a.abs_diff(b),
        (None, None) => 0,
        _ => u8::MAX,
    }
}
