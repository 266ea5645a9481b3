use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tokio::sync::watch;

use fairway::config::Config;
use fairway::context::Services;
use fairway::metrics;
use fairway::server::{self, AppState};

/// Run the HTTP server and the warm-up scheduler until a shutdown signal
pub async fn serve(config: Config) -> Result<()> {
    metrics::init_metrics().map_err(|e| anyhow!("Failed to initialize metrics: {e}"))?;

    let services = Arc::new(
        Services::init(&config)
            .await
            .context("Failed to initialize services")?,
    );

    tracing::info!(
        courses = services.registry.len(),
        cache = services.cache.backend(),
        "Services ready"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = if config.scheduler.enabled {
        Some(Arc::clone(&services.scheduler).spawn(shutdown_rx))
    } else {
        tracing::info!("Warm-up scheduler disabled");
        None
    };

    let result = match server::bind(&config.server).await {
        Ok(listener) => {
            let router = server::build_router(AppState::new(Arc::clone(&services)), &config.server);
            server::serve(listener, router, shutdown_signal()).await
        }
        Err(e) => Err(e),
    };

    let _ = shutdown_tx.send(true);
    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Scheduler task failed");
        }
    }

    services.shutdown().await;

    result.context("HTTP server failed")
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
