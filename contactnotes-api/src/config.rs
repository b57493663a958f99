/// Configuration management for the API server
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `APP_ENV`: `development` or `production` (default: development)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: *)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for JWT signing, at least 32 characters (required)
/// - `JWT_ACCESS_TOKEN_EXPIRES`: Access token lifetime in seconds (default: 3600)
/// - `REDIS_URL`: Redis connection string (optional)
/// - `RATE_LIMIT_PER_MINUTE`: Requests per user per minute (default: 100)
///
/// Without `REDIS_URL` the server still runs, but tasks cannot be enqueued
/// and rate limiting and token revocation are disabled.
///
/// # Example
///
/// ```no_run
/// use contactnotes_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub redis: Option<RedisSettings>,
    pub rate_limit: RateLimitConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Enables production-only behavior such as HSTS
    pub production: bool,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be kept secret and be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Access token lifetime in seconds
    pub access_token_expires_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Bucket capacity and refill per minute
    pub per_minute: u32,
}

impl Config {
    /// Loads configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is invalid.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port = lookup("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()?;

        let production = lookup("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let access_token_expires_secs = lookup("JWT_ACCESS_TOKEN_EXPIRES")
            .unwrap_or_else(|| "3600".to_string())
            .parse::<i64>()?;

        if access_token_expires_secs <= 0 {
            anyhow::bail!("JWT_ACCESS_TOKEN_EXPIRES must be positive");
        }

        let redis = lookup("REDIS_URL")
            .filter(|url| !url.trim().is_empty())
            .map(|url| RedisSettings { url });

        let per_minute = lookup("RATE_LIMIT_PER_MINUTE")
            .unwrap_or_else(|| "100".to_string())
            .parse::<u32>()?;

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                production,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_token_expires_secs,
            },
            redis,
            rate_limit: RateLimitConfig { per_minute },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.jwt.access_token_expires_secs)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            production: false,
            cors_origins: vec!["*".to_string()],
        },
        database: DatabaseConfig {
            url: "postgresql://localhost/test".to_string(),
            max_connections: 10,
        },
        jwt: JwtConfig {
            secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            access_token_expires_secs: 3600,
        },
        redis: None,
        rate_limit: RateLimitConfig { per_minute: 100 },
    }
}
