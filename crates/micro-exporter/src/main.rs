//! micro-exporter — Prometheus exporter for NATS microservices.
//!
//! Polls the fleet with `$SRV.STATS` in the background and serves the last
//! snapshot on `/metrics`.
//!
//! # Usage
//!
//! ```text
//! micro-exporter --server nats://localhost:4222 --port 10015 --scrape-interval 15
//! ```

use std::sync::Arc;

use clap::Parser;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use micro_discovery::DiscoveryPoller;
use micro_exporter::{build_router, nats, ExporterConfig, NatsTransport};
use micro_metrics::MicroCollector;
use micro_state::SnapshotStore;

const DEFAULT_FILTER: &str = "info,micro_exporter=debug,micro_discovery=debug";

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ExporterConfig::parse();
    init_tracing(config.log_json);
    config.validate()?;

    run(config).await
}

async fn run(config: ExporterConfig) -> anyhow::Result<()> {
    info!("micro-exporter starting");

    // ── Initialize subsystems ──────────────────────────────────

    let client = nats::connect(&config).await?;
    let transport = Arc::new(NatsTransport::new(client));

    let store = SnapshotStore::new();

    let registry = Registry::new();
    registry.register(Box::new(MicroCollector::new(store.clone())?))?;

    let poller = DiscoveryPoller::new(transport, store.clone(), config.poller_config());
    info!(
        interval_secs = config.scrape_interval,
        timeout = ?config.discovery_timeout,
        "discovery poller initialized"
    );

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let poller_handle = tokio::spawn(async move {
        poller.run(shutdown_rx).await;
    });

    // ── Start HTTP server ──────────────────────────────────────

    let router = build_router(registry, store);
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "metrics server listening");

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // The poller drops any in-flight poll as soon as it sees the signal.
    let _ = poller_handle.await;

    info!("micro-exporter stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
