//! Monitor loop: probe, classify, persist, sleep.

mod detector;

pub use detector::*;

use std::any::Any;
use std::panic::AssertUnwindSafe;

use chrono::Local;
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::watch;

use crate::config::MonitorConfig;
use crate::db::{AppendOutcome, StoreError, StoreWriter};
use crate::eventlog::EventLog;
use crate::probe::NetworkProbe;
use crate::sample::{AdapterStatus, Latency, Sample};

/// Failures that escape a tick.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("network sampling panicked: {0}")]
    Sampling(String),
    #[error("event writer task failed: {0}")]
    Writer(#[from] tokio::task::JoinError),
}

/// What a single tick did.
#[derive(Debug)]
pub struct TickReport {
    pub sample: Sample,
    pub reportable: bool,
    /// `None` when nothing was written.
    pub persisted: Option<Persisted>,
}

/// Outcome of both writers for one reportable sample.
#[derive(Debug)]
pub struct Persisted {
    pub event_log: std::io::Result<()>,
    pub store: Result<AppendOutcome, StoreError>,
}

/// Owns the loop state; the only writer of the event log and the workbook.
pub struct Monitor<P> {
    config: MonitorConfig,
    probe: P,
    detector: ChangeDetector,
    state: MonitorState,
    event_log: EventLog,
    store: StoreWriter,
}

impl<P: NetworkProbe> Monitor<P> {
    pub fn new(config: MonitorConfig, probe: P) -> Self {
        Self {
            detector: ChangeDetector::new(Thresholds::from(&config)),
            state: MonitorState::default(),
            event_log: EventLog::new(config.log_path.clone()),
            store: StoreWriter::new(config.store_path.clone()),
            config,
            probe,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Run until `shutdown` turns true. Returns the number of ticks run.
    ///
    /// Shutdown is only observed between ticks, so a tick in progress always
    /// finishes its writes.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        println!(
            "Wi-Fi monitor started: checking every {:?}, pinging {} (timeout {:?})",
            self.config.check_interval, self.config.ping_target_host, self.config.ping_timeout
        );
        println!(
            "Events: {}  Workbook: {}  (Ctrl-C to stop)",
            self.event_log.path().display(),
            self.store.path().display()
        );

        let mut ticks = 0u64;
        while !*shutdown.borrow() {
            let pause = match self.tick().await {
                Ok(_) => self.config.check_interval,
                Err(e) => {
                    tracing::error!(
                        "Tick failed: {}; retrying in {:?}",
                        e,
                        self.config.error_backoff
                    );
                    self.config.error_backoff
                }
            };
            ticks += 1;

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        tracing::warn!("Shutdown channel closed; stopping");
                        break;
                    }
                }
            }
        }

        println!("Wi-Fi monitor stopped after {} checks.", ticks);
        ticks
    }

    /// One probe-classify-persist cycle.
    pub async fn tick(&mut self) -> Result<TickReport, MonitorError> {
        let timestamp = Local::now().naive_local();
        let (adapter, latency) = AssertUnwindSafe(self.sample_network())
            .catch_unwind()
            .await
            .map_err(|payload| MonitorError::Sampling(panic_message(payload.as_ref())))?;
        let sample = Sample::new(timestamp, adapter, latency);

        println!("{}", sample.status_line());

        let reportable = self.detector.classify(&sample, &mut self.state);
        let persisted = if reportable {
            Some(self.persist(&sample).await?)
        } else {
            None
        };

        Ok(TickReport {
            sample,
            reportable,
            persisted,
        })
    }

    async fn sample_network(&self) -> (AdapterStatus, Latency) {
        let adapter = self.probe.probe_adapter().await;
        let latency = self
            .probe
            .probe_latency(&self.config.ping_target_host, self.config.ping_timeout)
            .await;
        (adapter, latency)
    }

    /// Write `sample` to both sinks. A failing sink is logged, not fatal.
    async fn persist(&self, sample: &Sample) -> Result<Persisted, MonitorError> {
        let event_log = self.event_log.clone();
        let store = self.store.clone();
        let sample = sample.clone();

        let persisted = tokio::task::spawn_blocking(move || Persisted {
            event_log: event_log.append(&sample),
            store: store.append_row(&sample),
        })
        .await?;

        if let Err(e) = &persisted.event_log {
            tracing::error!(
                "Failed to append to {}: {}",
                self.event_log.path().display(),
                e
            );
        }
        if let Err(e) = &persisted.store {
            tracing::error!(
                "Failed to save workbook {}: {}",
                self.store.path().display(),
                e
            );
        }

        Ok(persisted)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
