//! Vinyl API Server Entry Point
//!
//! Loads configuration, initializes telemetry and the store pools, and serves
//! the Axum router until SIGINT or SIGTERM.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use vinyl_api::telemetry::init_telemetry;
use vinyl_api::{create_api_router, ApiError, ApiResult, AppConfig, AppState, CacheClient, DbClient};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = AppConfig::from_env()?;
    let telemetry = init_telemetry(&config.telemetry)?;

    let db = DbClient::from_config(&config.db)?;
    let cache = CacheClient::from_config(&config.cache)?;
    let state = AppState::new(db, cache, config.cache.ttl);

    let app = create_api_router(state, &config);

    let addr = config.bind_addr;
    tracing::info!(%addr, "Starting Vinyl API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = shutdown_rx.await;
    });

    let mut server = std::pin::pin!(server.into_future());
    tokio::select! {
        result = &mut server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
                Ok(result) => {
                    result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
                }
                Err(_) => tracing::warn!("Graceful shutdown timed out, dropping open connections"),
            }
        }
    }

    tracing::info!("Server exiting");
    telemetry.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
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
}
