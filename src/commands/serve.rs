use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use docs_hub::metrics;
use docs_hub::refresh::RefreshCoordinator;
use docs_hub::server::HubServer;

use super::load_config;

/// Start the hub: initial refresh, recurring schedule, then the HTTP server
pub async fn serve(config: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = load_config(config)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    metrics::init_metrics().context("Failed to register metrics")?;

    tracing::info!(
        environment = %config.environment,
        tenant = %config.tenant,
        region = %config.region,
        services = config.services.len(),
        "Loaded configuration"
    );

    let coordinator = Arc::new(RefreshCoordinator::from_config(&config)?);

    // Populate the cache before accepting requests
    let report = coordinator.refresh_all().await;
    if !report.is_success() {
        tracing::warn!(
            failed = report.failed.len(),
            total = report.total(),
            "Initial refresh incomplete"
        );
    }

    let shutdown = CancellationToken::new();
    let schedule = coordinator.spawn_schedule(config.refresh_duration(), shutdown.clone());

    tokio::spawn(wait_for_signal(shutdown.clone()));

    let server = HubServer::new(config.server.clone(), Arc::clone(&coordinator));

    let served = server.serve(shutdown.clone()).await;

    // Server may also exit on a bind failure; stop the schedule either way
    shutdown.cancel();
    if let Err(e) = schedule.await {
        tracing::error!("Refresh schedule task failed: {}", e);
    }

    served.context("Server error")?;
    tracing::info!("docs-hub stopped");
    Ok(())
}

async fn wait_for_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to wait for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received, stopping...");
    token.cancel();
}
