//! # Contact Notes API Server
//!
//! REST API for users, contacts and notes. Creating a note queues a
//! `process_note` task for `contactnotes-worker`.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p contactnotes-api
//! ```

use std::sync::Arc;

use contactnotes_api::app::{build_router, AppState};
use contactnotes_api::config::Config;
use contactnotes_shared::db::migrations::run_migrations;
use contactnotes_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
use contactnotes_shared::queue::{RedisTaskQueue, TaskQueue, UnavailableTaskQueue};
use contactnotes_shared::redis::{RedisClient, RedisConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contactnotes_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Contact Notes API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig::new(
        config.database.url.clone(),
        config.database.max_connections,
    ))
    .await?;
    run_migrations(&pool).await?;

    // Redis is optional; without it notes are still stored but never processed
    let redis = match &config.redis {
        Some(settings) => match RedisClient::new(RedisConfig::with_url(settings.url.clone())).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, continuing without queue and rate limiting");
                None
            }
        },
        None => {
            tracing::warn!("REDIS_URL not set, continuing without queue and rate limiting");
            None
        }
    };

    let queue: Arc<dyn TaskQueue> = match &redis {
        Some(client) => Arc::new(RedisTaskQueue::new(client.clone())),
        None => Arc::new(UnavailableTaskQueue),
    };

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config, queue, redis));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
