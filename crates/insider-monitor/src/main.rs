//! Insider Monitor
//!
//! Long-running service: polls the Polymarket Data API for large trades,
//! scores them for insider-like patterns, and emits alerts.

use anyhow::Result;
use insider_core::api::{DataClient, GammaClient};
use insider_core::config::Config;
use insider_core::db::{self, Store};
use insider_monitor::alerts;
use insider_monitor::processor::Processor;
use insider_monitor::server::{self, ServerState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The win-rate reconciler ticks once a day.
const WIN_RATE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "insider_monitor=info,insider_core=info,sqlx=warn,hyper=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting insider monitor");

    let cfg = Arc::new(Config::from_env()?);
    info!(
        environment = %cfg.environment,
        big_trade_usd = cfg.detection.big_trade_usd,
        new_wallet_days_max = cfg.detection.new_wallet_days_max,
        poll_interval_sec = cfg.detection.poll_interval_secs,
        alert_mode = %cfg.alerts.mode,
        "Configuration loaded"
    );

    let pool = db::create_pool(&cfg.database).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected, migrations complete");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let data = DataClient::new(&cfg.data_api, shutdown_rx.clone())?;
    let gamma = GammaClient::new(&cfg.gamma_api, shutdown_rx.clone())?;
    let sender = alerts::build_sender(&cfg)?;
    info!(alert_mode = %cfg.alerts.mode, "Alert senders initialized");

    let store = Store::new(pool.clone());
    let processor = Arc::new(Processor::new(
        cfg.clone(),
        store,
        data,
        gamma,
        sender,
        shutdown_rx.clone(),
    ));

    // Operator surface runs alongside the pipeline.
    let server_state = Arc::new(ServerState { pool });
    let server_shutdown = shutdown_rx.clone();
    let health_port = cfg.health_port;
    tokio::spawn(async move {
        if let Err(e) = server::serve(server_state, health_port, server_shutdown).await {
            error!(error = %e, "HTTP server failed");
        }
    });

    // Translate ctrl-c into the shared shutdown signal.
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let mut poll_tick =
        tokio::time::interval(Duration::from_secs(cfg.detection.poll_interval_secs.max(1)));
    let mut win_rate_tick = tokio::time::interval(WIN_RATE_INTERVAL);
    // The first tick of each interval fires immediately; the poll loop uses
    // it as the startup run, and the reconciler's startup run is spawned
    // separately below so it never delays polling.
    win_rate_tick.tick().await;

    let reconciler = processor.clone();
    tokio::spawn(async move {
        if let Err(e) = reconciler.reconcile_win_rates().await {
            error!(error = %e, "Win rate reconciliation failed at startup");
        }
    });

    info!("Starting trade processing loop");
    let mut shutdown = shutdown_rx;

    loop {
        tokio::select! {
            _ = poll_tick.tick() => {
                if let Err(e) = processor.process_cycle().await {
                    error!(error = %e, "Error processing trades");
                }
            }
            _ = win_rate_tick.tick() => {
                let reconciler = processor.clone();
                tokio::spawn(async move {
                    if let Err(e) = reconciler.reconcile_win_rates().await {
                        error!(error = %e, "Win rate reconciliation failed");
                    }
                });
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
                warn!("Shutdown channel closed unexpectedly");
                break;
            }
        }
    }

    info!("Graceful shutdown complete");
    Ok(())
}
