/// Redis client wrapper with connection management and health checks
///
/// Wraps `redis::aio::ConnectionManager`, which reconnects on its own after
/// a dropped connection. One `RedisClient` is built at process start and
/// cloned into whatever needs it (task queue, rate limiter, revocation
/// store, result backend).
///
/// # Example
///
/// ```no_run
/// use contactnotes_shared::redis::client::{RedisClient, RedisConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = RedisConfig::with_url("redis://localhost:6379");
/// let client = RedisClient::new(config).await?;
///
/// let healthy = client.ping().await?;
/// println!("Redis healthy: {}", healthy);
/// # Ok(())
/// # }
/// ```

use redis::aio::ConnectionManager;
use redis::{Client, RedisError};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Redis client errors
#[derive(Error, Debug)]
pub enum RedisClientError {
    #[error("Redis connection error: {0}")]
    ConnectionError(String),

    #[error("Redis command error: {0}")]
    CommandError(String),

    #[error("Redis configuration error: {0}")]
    ConfigError(String),

    #[error("Redis health check failed: {0}")]
    HealthCheckFailed(String),
}

impl From<RedisError> for RedisClientError {
    fn from(err: RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::IoError => {
                RedisClientError::ConnectionError(format!("IO error: {}", err))
            }
            redis::ErrorKind::ResponseError => {
                RedisClientError::CommandError(format!("Response error: {}", err))
            }
            _ => RedisClientError::CommandError(err.to_string()),
        }
    }
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL, `redis://[username:password@]host:port[/db]`
    pub url: String,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Command timeout in seconds
    pub command_timeout_secs: u64,
}

impl RedisConfig {
    /// Creates a configuration for `url` with default timeouts
    /// overridable through the environment
    ///
    /// - `REDIS_CONNECTION_TIMEOUT_SECS` (default: 5)
    /// - `REDIS_COMMAND_TIMEOUT_SECS` (default: 10)
    pub fn with_url(url: impl Into<String>) -> Self {
        let connection_timeout_secs = env::var("REDIS_CONNECTION_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let command_timeout_secs = env::var("REDIS_COMMAND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Self {
            url: url.into(),
            connection_timeout_secs,
            command_timeout_secs,
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    #[cfg(test)]
    pub fn default_for_test() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connection_timeout_secs: 5,
            command_timeout_secs: 10,
        }
    }
}

/// Redis client with connection management
///
/// Cloning is cheap; all clones share one multiplexed connection.
#[derive(Clone)]
pub struct RedisClient {
    client: Client,
    manager: ConnectionManager,
    config: Arc<RedisConfig>,
}

impl RedisClient {
    /// Connects to Redis
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the connection cannot be
    /// established within the connection timeout.
    pub async fn new(config: RedisConfig) -> Result<Self, RedisClientError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| RedisClientError::ConfigError(format!("Invalid Redis URL: {}", e)))?;

        let manager = connect(&client, &config).await?;

        tracing::info!(
            url = %sanitize_url(&config.url),
            "Redis client connected successfully"
        );

        Ok(Self {
            client,
            manager,
            config: Arc::new(config),
        })
    }

    /// Performs a health check by sending a PING command
    pub async fn ping(&self) -> Result<bool, RedisClientError> {
        let mut conn = self.manager.clone();

        let result: Result<String, RedisError> = tokio::time::timeout(
            self.config.command_timeout(),
            redis::cmd("PING").query_async(&mut conn),
        )
        .await
        .map_err(|_| RedisClientError::HealthCheckFailed("PING command timed out".to_string()))?;

        match result {
            Ok(pong) if pong == "PONG" => {
                tracing::debug!("Redis health check: PONG received");
                Ok(true)
            }
            Ok(other) => {
                tracing::warn!(response = %other, "Redis health check: unexpected response");
                Ok(false)
            }
            Err(e) => {
                tracing::error!(error = %e, "Redis health check failed");
                Err(RedisClientError::HealthCheckFailed(e.to_string()))
            }
        }
    }

    /// Gets a handle on the shared connection
    pub fn get_connection(&self) -> ConnectionManager {
        self.manager.clone()
    }

    /// Opens a new connection that is not shared with other clones
    ///
    /// Blocking commands such as `BRPOP` hold their connection until they
    /// return, so they must not run on the shared one.
    pub async fn dedicated_connection(&self) -> Result<ConnectionManager, RedisClientError> {
        connect(&self.client, &self.config).await
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }
}

async fn connect(client: &Client, config: &RedisConfig) -> Result<ConnectionManager, RedisClientError> {
    tokio::time::timeout(
        Duration::from_secs(config.connection_timeout_secs),
        ConnectionManager::new(client.clone()),
    )
    .await
    .map_err(|_| RedisClientError::ConnectionError("Timed out connecting to Redis".to_string()))?
    .map_err(|e| RedisClientError::ConnectionError(format!("Failed to connect to Redis: {}", e)))
}

/// Replaces the credentials in a Redis URL with `***:***` for logging
pub fn sanitize_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(scheme_end) = url.find("://") {
            let scheme = &url[..scheme_end + 3];
            let host = &url[at_pos + 1..];
            return format!("{}***:***@{}", scheme, host);
        }
    }
    url.to_string()
}
