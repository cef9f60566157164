use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;

use seadex_monitor::config::Config;
use seadex_monitor::metrics;
use seadex_monitor::server::{self, AppState};
use seadex_monitor::sync::{Scheduler, SyncEngine, Trigger};

/// Run until Ctrl-C: webhook listener, startup pass, then scheduled passes
pub async fn run(config: Config) -> Result<()> {
    if let Err(e) = metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics disabled");
    }

    let engine = Arc::new(SyncEngine::from_config(&config)?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener = if config.webhook.enabled {
        let addr = config.webhook.bind_address()?;
        let mut stop = shutdown_rx.clone();
        let state = AppState::new(Arc::clone(&engine));
        Some(tokio::spawn(server::serve(addr, state, async move {
            let _ = stop.changed().await;
        })))
    } else {
        tracing::info!("Webhook listener disabled, using scheduled passes only");
        None
    };

    if config.sync.startup_scan {
        tracing::info!("Running startup pass");
        engine.run_pass(Trigger::Startup).await;
    }

    let scheduler = Scheduler::new(Arc::clone(&engine), config.sync_interval()).spawn(shutdown_rx);

    tracing::info!("Monitor started, press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);

    scheduler.await.context("Scheduler task failed")?;

    if let Some(listener) = listener {
        match listener.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Webhook listener failed"),
            Err(e) => tracing::error!(error = %e, "Webhook listener task failed"),
        }
    }

    tracing::info!("seadex-monitor stopped");
    Ok(())
}
