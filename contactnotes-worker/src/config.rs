/// Worker configuration
///
/// Read from the environment (after loading `.env`):
///
/// | Variable                   | Default                   |
/// |----------------------------|---------------------------|
/// | `DATABASE_URL`             | required                  |
/// | `DATABASE_MAX_CONNECTIONS` | 5                         |
/// | `REDIS_URL`                | required                  |
/// | `UPSTREAM_BASE_URL`        | `http://127.0.0.1:5000`   |
/// | `UPSTREAM_TIMEOUT_SECS`    | 3                         |
/// | `UPSTREAM_MAX_ATTEMPTS`    | 3                         |
/// | `WORKER_CONCURRENCY`       | 4                         |
/// | `WORKER_POLL_TIMEOUT_SECS` | 5                         |
/// | `RESULT_TTL_SECS`          | 86400                     |

use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::upstream::RetryPolicy;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkerConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: String,
    pub upstream_base_url: String,
    pub upstream_timeout: Duration,
    pub upstream_max_attempts: u32,
    pub concurrency: usize,
    pub poll_timeout: Duration,
    pub result_ttl_secs: u64,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, WorkerConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WorkerConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(WorkerConfigError::Missing(var))
        };

        let config = Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            redis_url: required("REDIS_URL")?,
            upstream_base_url: lookup("UPSTREAM_BASE_URL")
                .unwrap_or_else(|| "http://127.0.0.1:5000".to_string()),
            upstream_timeout: Duration::from_secs(parse_or(&lookup, "UPSTREAM_TIMEOUT_SECS", 3)?),
            upstream_max_attempts: parse_or(&lookup, "UPSTREAM_MAX_ATTEMPTS", 3)?,
            concurrency: parse_or(&lookup, "WORKER_CONCURRENCY", 4)?,
            poll_timeout: Duration::from_secs(parse_or(&lookup, "WORKER_POLL_TIMEOUT_SECS", 5)?),
            result_ttl_secs: parse_or(&lookup, "RESULT_TTL_SECS", 86400)?,
        };

        if config.concurrency == 0 {
            return Err(WorkerConfigError::Invalid {
                var: "WORKER_CONCURRENCY",
                value: "0".to_string(),
            });
        }
        if config.upstream_max_attempts == 0 {
            return Err(WorkerConfigError::Invalid {
                var: "UPSTREAM_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }

        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.upstream_max_attempts,
            attempt_timeout: self.upstream_timeout,
            ..RetryPolicy::default()
        }
    }
}

fn parse_or<T, F>(lookup: &F, var: &'static str, default: T) -> Result<T, WorkerConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| WorkerConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/contactnotes"),
            ("REDIS_URL", "redis://localhost:6379"),
        ]))
        .unwrap();

        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.upstream_base_url, "http://127.0.0.1:5000");
        assert_eq!(config.upstream_timeout, Duration::from_secs(3));
        assert_eq!(config.upstream_max_attempts, 3);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.poll_timeout, Duration::from_secs(5));
        assert_eq!(config.result_ttl_secs, 86400);

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.attempt_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_missing_required() {
        let err = WorkerConfig::from_lookup(lookup_from(&[("REDIS_URL", "redis://x")])).unwrap_err();
        assert_eq!(err, WorkerConfigError::Missing("DATABASE_URL"));

        let err =
            WorkerConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert_eq!(err, WorkerConfigError::Missing("REDIS_URL"));
    }

    #[test]
    fn test_invalid_numbers() {
        let err = WorkerConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("REDIS_URL", "redis://x"),
            ("WORKER_CONCURRENCY", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, WorkerConfigError::Invalid { var: "WORKER_CONCURRENCY", .. }));

        let err = WorkerConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("REDIS_URL", "redis://x"),
            ("UPSTREAM_MAX_ATTEMPTS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, WorkerConfigError::Invalid { var: "UPSTREAM_MAX_ATTEMPTS", .. }));
    }

    #[test]
    fn test_overrides() {
        let config = WorkerConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("REDIS_URL", "redis://x"),
            ("UPSTREAM_BASE_URL", "http://notes.internal:9000"),
            ("UPSTREAM_TIMEOUT_SECS", "7"),
            ("WORKER_CONCURRENCY", " 16 "),
        ]))
        .unwrap();

        assert_eq!(config.upstream_base_url, "http://notes.internal:9000");
        assert_eq!(config.upstream_timeout, Duration::from_secs(7));
        assert_eq!(config.concurrency, 16);
    }
}
