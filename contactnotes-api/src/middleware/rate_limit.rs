/// Per-user rate limiting
///
/// Token bucket keyed by the authenticated user, with the bucket state kept
/// in Redis so every API instance shares it.
///
/// # Algorithm
///
/// - Bucket capacity and refill are both `RATE_LIMIT_PER_MINUTE`
/// - Each request consumes 1 token
/// - Request rejected with 429 when the bucket is empty
///
/// # Storage
///
/// Hash at `contactnotes:ratelimit:user:{user_id}` with fields `tokens` and
/// `last_refill`, expiring after 2 idle minutes. The refill-and-take step runs
/// as one Lua script so concurrent requests cannot double-spend.
///
/// # Headers
///
/// - `X-RateLimit-Limit`: requests allowed per minute
/// - `X-RateLimit-Remaining`: tokens left after this request
/// - `Retry-After`: seconds to wait (429 responses only)
///
/// Without Redis, or when the script fails, requests are let through.

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Extension, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use contactnotes_shared::auth::middleware::AuthContext;
use contactnotes_shared::redis::{RedisClient, RedisClientError};
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const RATE_LIMIT_KEY_PREFIX: &str = "contactnotes:ratelimit:user:";

const BUCKET_SCRIPT: &str = r#"
local key = KEYS[1]
local capacity = tonumber(ARGV[1])
local refill_rate = tonumber(ARGV[2])
local now = tonumber(ARGV[3])

local bucket = redis.call('HMGET', key, 'tokens', 'last_refill')
local tokens = tonumber(bucket[1])
local last_refill = tonumber(bucket[2])

if not tokens then
    tokens = capacity
    last_refill = now
end

local elapsed = math.max(0, now - last_refill)
tokens = math.min(capacity, tokens + (elapsed * refill_rate))

if tokens >= 1 then
    tokens = tokens - 1
    redis.call('HMSET', key, 'tokens', tokens, 'last_refill', now)
    redis.call('EXPIRE', key, 120)
    return {1, math.floor(tokens), 0}
else
    return {0, 0, math.ceil((1 - tokens) / refill_rate)}
end
"#;

/// Bucket parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimit {
    pub requests_per_minute: u32,

    /// Tokens added per second
    pub refill_rate: f64,

    /// Burst size
    pub bucket_capacity: u32,
}

impl RateLimit {
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let requests_per_minute = requests_per_minute.max(1);
        Self {
            requests_per_minute,
            refill_rate: requests_per_minute as f64 / 60.0,
            bucket_capacity: requests_per_minute,
        }
    }
}

/// Outcome of one bucket check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub ok: bool,
    pub remaining: u32,

    /// Seconds until a token is available (0 when allowed)
    pub retry_after: u64,
}

impl RateLimitResult {
    fn from_script(reply: &[i64]) -> Option<Self> {
        match reply {
            [ok, remaining, retry_after] => {
                let ok = *ok == 1;
                Some(Self {
                    ok,
                    remaining: (*remaining).max(0) as u32,
                    retry_after: if ok { 0 } else { (*retry_after).max(1) as u64 },
                })
            }
            _ => None,
        }
    }

    fn exceeded_error(&self) -> ApiError {
        ApiError::RateLimitExceeded {
            retry_after: self.retry_after,
            message: format!(
                "Rate limit exceeded. Try again in {} seconds",
                self.retry_after
            ),
        }
    }
}

pub fn rate_limit_key(user_id: i64) -> String {
    format!("{}{}", RATE_LIMIT_KEY_PREFIX, user_id)
}

/// Rate limiting middleware layer
///
/// Must run after JWT authentication, which provides the `AuthContext`.
pub async fn rate_limit_layer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let limit = RateLimit::per_minute(state.config.rate_limit.per_minute);

    let Some(redis) = state.redis.as_ref() else {
        return Ok(next.run(request).await);
    };

    let outcome = match check_rate_limit(redis, auth.user_id, limit).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            tracing::warn!(error = %e, user_id = auth.user_id, "Rate limit check failed, allowing request");
            None
        }
    };

    if let Some(outcome) = outcome.filter(|o| !o.ok) {
        tracing::info!(user_id = auth.user_id, retry_after = outcome.retry_after, "Rate limit exceeded");
        return Err(outcome.exceeded_error());
    }

    let mut response = next.run(request).await;

    if let Some(outcome) = outcome {
        let headers = response.headers_mut();
        headers.insert("X-RateLimit-Limit", HeaderValue::from(limit.requests_per_minute));
        headers.insert("X-RateLimit-Remaining", HeaderValue::from(outcome.remaining));
    }

    Ok(response)
}

/// Refills the user's bucket and tries to take one token
pub async fn check_rate_limit(
    redis: &RedisClient,
    user_id: i64,
    limit: RateLimit,
) -> Result<RateLimitResult, RedisClientError> {
    let mut conn = redis.get_connection();
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let script = redis::Script::new(BUCKET_SCRIPT);
    let mut invocation = script.key(rate_limit_key(user_id));
    invocation
        .arg(limit.bucket_capacity)
        .arg(limit.refill_rate)
        .arg(now);

    let reply: Vec<i64> = bounded(
        redis.config().command_timeout(),
        invocation.invoke_async(&mut conn),
    )
    .await?;

    RateLimitResult::from_script(&reply).ok_or_else(|| {
        RedisClientError::CommandError(format!("unexpected rate limit reply: {:?}", reply))
    })
}

/// Fails the bucket check instead of waiting on a stalled Redis
async fn bounded<T, F>(timeout: Duration, fut: F) -> Result<T, RedisClientError>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| RedisClientError::CommandError("rate limit script timed out".to_string()))?
        .map_err(Into::into)
}
