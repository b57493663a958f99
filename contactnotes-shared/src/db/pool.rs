/// Database connection pool management
///
/// Both the API server and the worker talk to PostgreSQL through a single
/// `PgPool` built here. Each HTTP request borrows a connection for the
/// duration of its queries; each background task opens its own transaction
/// (see the worker's note source).
///
/// # Example
///
/// ```no_run
/// use contactnotes_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), sqlx::Error> {
/// let pool = create_pool(DatabaseConfig::new("postgresql://localhost/contactnotes", 10)).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the database connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of idle connections kept warm
    pub min_connections: u32,

    /// Timeout for acquiring a connection (seconds)
    pub acquire_timeout_seconds: u64,

    /// Idle connections are closed after this many seconds
    pub idle_timeout_seconds: Option<u64>,

    /// Connections are recycled after this many seconds
    pub max_lifetime_seconds: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            max_lifetime_seconds: Some(1800),
        }
    }
}

impl DatabaseConfig {
    /// Creates a configuration with the given URL and pool size, other settings default
    pub fn new(url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            url: url.into(),
            max_connections,
            min_connections: max_connections.min(1),
            ..Default::default()
        }
    }
}

/// Creates a PostgreSQL connection pool and verifies connectivity
///
/// # Errors
///
/// Returns an error if the URL is invalid, the database is unreachable,
/// or the health check query fails.
pub async fn create_pool(config: DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Creating database connection pool"
    );

    let mut pool_options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds));

    if let Some(idle_timeout) = config.idle_timeout_seconds {
        pool_options = pool_options.idle_timeout(Duration::from_secs(idle_timeout));
        debug!(idle_timeout_seconds = idle_timeout, "Set idle timeout");
    }

    if let Some(max_lifetime) = config.max_lifetime_seconds {
        pool_options = pool_options.max_lifetime(Duration::from_secs(max_lifetime));
        debug!(max_lifetime_seconds = max_lifetime, "Set max lifetime");
    }

    let pool = pool_options.connect(&config.url).await?;

    health_check(&pool).await?;

    info!("Database connection pool created");
    Ok(pool)
}

/// Runs `SELECT 1` against the pool
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    let result: (i32,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;

    if result.0 == 1 {
        debug!("Database health check passed");
        Ok(())
    } else {
        warn!("Database health check returned unexpected value: {}", result.0);
        Err(sqlx::Error::Protocol(
            "Health check returned unexpected value".into(),
        ))
    }
}

/// Closes the pool, waiting for checked-out connections to be returned
pub async fn close_pool(pool: PgPool) {
    info!("Closing database connection pool");
    pool.close().await;
    info!("Database connection pool closed");
}
