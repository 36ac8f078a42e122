use anyhow::Context;
use tokio::net::TcpListener;

use crate::config;
use crate::database::DatabaseManager;
use crate::state::AppState;

pub async fn handle() -> anyhow::Result<()> {
    let config = config::config();
    tracing::info!("Starting company registration API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set outside development");
    }

    // The pool connects lazily; a database outage is reported by /health
    // rather than preventing startup.
    if config.database.run_migrations {
        if let Err(e) = DatabaseManager::migrate().await {
            tracing::error!("Migrations not applied: {}", e);
        }
    }

    let app = crate::app(AppState::from_config(config));

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("server error")?;

    DatabaseManager::close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("Shutdown signal received");
}
