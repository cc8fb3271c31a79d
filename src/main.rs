//! Shop Cache - tiered caching for the storefront backend
//!
//! Runs the cache with its operational HTTP endpoints (stats, health,
//! invalidation) and the background sweeper and reconnection tasks.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shop_cache::api::create_router;
use shop_cache::{spawn_reconnect_task, spawn_sweeper_task, AppState, Config};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache and make the first Redis connection attempt
/// 4. Start the sweeper and reconnection tasks
/// 5. Serve the operational endpoints until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shop_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Shop Cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: redis_enabled={}, redis={}:{}, port={}, sweep_interval={}s, reconnect_interval={}s",
        config.redis_enabled,
        config.redis_host,
        config.redis_port,
        config.server_port,
        config.sweep_interval,
        config.reconnect_interval
    );

    let state = AppState::from_config(&config);
    let mode = state.cache.initialize().await;
    info!("Cache initialized in {:?} mode", mode);

    let tasks = vec![
        spawn_sweeper_task(state.cache.memory().clone(), config.sweep_interval),
        spawn_reconnect_task(
            state.cache.controller().clone(),
            Duration::from_secs(config.reconnect_interval),
        ),
    ];
    info!("Background tasks started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tasks))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then aborts background tasks.
async fn shutdown_signal(tasks: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for task in tasks {
        task.abort();
    }
    warn!("Background tasks aborted");
}
