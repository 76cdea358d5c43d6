//! wifiwatch - Wi-Fi and internet health monitor
//!
//! Samples the wireless adapter and internet latency on a fixed cadence and
//! records state changes to a text log and a dated workbook.

mod config;
mod db;
mod eventlog;
mod monitor;
mod probe;
mod sample;

use config::MonitorConfig;
use monitor::Monitor;
use probe::SystemProbe;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("wifiwatch=info".parse()?))
        .init();

    let cfg = MonitorConfig::load();
    tracing::info!("Event log at {}", cfg.log_path.display());
    tracing::info!("Workbook at {}", cfg.store_path.display());

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                println!("\nInterrupt received, stopping after the current check...");
                let _ = stop_tx.send(true);
            }
            Err(e) => {
                // Without a handler the process can still be killed; keep monitoring
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });

    let mut monitor = Monitor::new(cfg, SystemProbe);
    monitor.run(stop_rx).await;

    Ok(())
}
