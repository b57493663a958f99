//! # Contact Notes Worker
//!
//! Consumes `process_note` tasks from the Redis queue and delivers each note
//! to the upstream notes service.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p contactnotes-worker
//! ```

use std::sync::Arc;

use contactnotes_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
use contactnotes_shared::queue::RedisTaskReceiver;
use contactnotes_shared::redis::{RedisClient, RedisConfig};
use contactnotes_worker::config::WorkerConfig;
use contactnotes_worker::orchestrator::{OrchestratorConfig, WorkerOrchestrator};
use contactnotes_worker::processor::{NoteProcessor, PgNoteSource};
use contactnotes_worker::results::RedisResultStore;
use contactnotes_worker::upstream::{HttpTransport, UpstreamNotifier};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contactnotes_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Contact Notes Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = WorkerConfig::from_env()?;

    let pool = create_pool(DatabaseConfig::new(
        config.database_url.clone(),
        config.database_max_connections,
    ))
    .await?;

    let redis = RedisClient::new(RedisConfig::with_url(config.redis_url.clone())).await?;
    let consumer = RedisTaskReceiver::connect(&redis).await?;
    let results = Arc::new(RedisResultStore::new(redis, config.result_ttl_secs));

    let notifier = UpstreamNotifier::new(
        Arc::new(HttpTransport::new()?),
        &config.upstream_base_url,
        config.retry_policy(),
    );
    tracing::info!(endpoint = %notifier.endpoint(), "Upstream notifier configured");

    let processor = NoteProcessor::new(Arc::new(PgNoteSource::new(pool.clone())), notifier);

    let mut orchestrator = WorkerOrchestrator::new(
        Box::new(consumer),
        results,
        OrchestratorConfig {
            concurrency: config.concurrency,
            poll_timeout: config.poll_timeout,
        },
    );
    orchestrator.register_handler(Arc::new(processor));

    let shutdown = orchestrator.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
        }
        shutdown.cancel();
    });

    tracing::info!("Worker ready and listening for tasks");
    orchestrator.run().await?;

    close_pool(pool).await;
    Ok(())
}
