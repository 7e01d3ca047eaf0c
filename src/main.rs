//! Shipment tracker - demo shipment-tracking HTTP service
//!
//! Module structure:
//! - `domain/` - Shipment types, tracking-number grammar, status catalog
//! - `services/` - Allocator, derivation engine, repository, service facade
//! - `io/` - HTTP API, request schemas, Prometheus exposition
//! - `infra/` - Config, metrics, clock and random ports

use clap::Parser;
use shipment_tracker::infra::{Config, Metrics, SystemClock, ThreadRandomSource};
use shipment_tracker::io::AppState;
use shipment_tracker::services::{InMemoryShipmentRepository, ShipmentService};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Shipment tracker - tracking number allocation and status lookup
#[derive(Parser, Debug)]
#[command(name = "shipment-tracker", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Default: INFO, use RUST_LOG=debug for per-request logs
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(git_hash = %env!("GIT_HASH"), "shipment-tracker starting");

    let args = Args::parse();
    let config_path = match args.config {
        Some(path) => path,
        None => Config::resolve_config_path(&[]),
    };
    let config = Config::load_from_path(&config_path);

    info!(
        config_file = %config.config_file(),
        listen = %config.listen_addr(),
        dated_prefix = %config.dated_prefix(),
        opaque_prefix = %config.opaque_prefix(),
        calendar = %config.calendar(),
        metrics_enabled = %config.metrics_enabled(),
        "config_loaded"
    );

    let metrics = Arc::new(Metrics::new());
    let service = ShipmentService::new(
        &config,
        Arc::new(InMemoryShipmentRepository::new()),
        Arc::new(SystemClock),
        Arc::new(ThreadRandomSource),
        metrics.clone(),
    );

    service.seed_demo_shipments(config.seed_shipments());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Periodic metrics report
    let reporter_metrics = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    let mut reporter_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        // First tick completes immediately
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => reporter_metrics.report().log(),
                _ = reporter_shutdown.changed() => {
                    if *reporter_shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    });

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    let state = Arc::new(AppState {
        service,
        metrics: metrics.clone(),
        metrics_enabled: config.metrics_enabled(),
    });

    if let Err(e) =
        shipment_tracker::io::start_server(&config.listen_addr(), state, shutdown_rx).await
    {
        error!(error = %e, "http_server_failed");
        return Err(e);
    }

    metrics.report().log();
    info!("shipment-tracker shutdown complete");
    Ok(())
}
