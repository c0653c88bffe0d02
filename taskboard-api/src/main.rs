//! # Taskboard API Server
//!
//! Role-based task management REST API: users register and authenticate,
//! create and assign tasks, and query aggregate analytics. List responses
//! are cached in Redis and invalidated on mutation, mutations fan out to
//! live clients over SSE, and assignees are notified through an outbound
//! third-party endpoint.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskboard-api
//! ```

use std::net::SocketAddr;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::broadcast::Broadcaster;
use taskboard_api::config::Config;
use taskboard_shared::db::{migrations, pool};
use taskboard_shared::redis::{RedisClient, RedisConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskboard_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Taskboard API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    // Load configuration
    let config = Config::from_env()?;

    // Database pool + migrations
    let db = pool::create_pool(pool::DatabaseConfig::from_env()?).await?;
    migrations::run_migrations(&db).await?;

    // Redis (response cache + rate limiting)
    let cache = RedisClient::new(RedisConfig::from_env()?).await?;

    // Live event fan-out, constructed once and passed in
    let broadcaster = Broadcaster::new();

    let bind_address = config.bind_address();
    let state = AppState::new(db, cache, broadcaster, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolves when the process receives Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
