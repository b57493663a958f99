/// Token revocation store
///
/// Logout records the token's `jti` under `contactnotes:revoked:{jti}` with a
/// TTL equal to the token's remaining lifetime, so entries disappear on
/// their own once the token would have expired anyway.

use redis::AsyncCommands;
use uuid::Uuid;

use crate::redis::{RedisClient, RedisClientError};

/// Key prefix for revoked token IDs
pub const REVOKED_KEY_PREFIX: &str = "contactnotes:revoked:";

pub fn revoked_key(token_id: Uuid) -> String {
    format!("{}{}", REVOKED_KEY_PREFIX, token_id)
}

/// Marks a token as revoked for `ttl_secs` seconds
pub async fn revoke_token(
    redis: &RedisClient,
    token_id: Uuid,
    ttl_secs: u64,
) -> Result<(), RedisClientError> {
    let mut conn = redis.get_connection();
    let _: () = tokio::time::timeout(
        redis.config().command_timeout(),
        redis::cmd("SETEX")
            .arg(revoked_key(token_id))
            .arg(ttl_secs.max(1))
            .arg(1u8)
            .query_async(&mut conn),
    )
    .await
    .map_err(|_| RedisClientError::CommandError("SETEX timed out".to_string()))??;

    tracing::debug!(token_id = %token_id, ttl_secs, "Token revoked");
    Ok(())
}

/// Checks whether a token was revoked
pub async fn is_revoked(redis: &RedisClient, token_id: Uuid) -> Result<bool, RedisClientError> {
    let mut conn = redis.get_connection();
    let exists: bool = tokio::time::timeout(
        redis.config().command_timeout(),
        conn.exists(revoked_key(token_id)),
    )
    .await
    .map_err(|_| RedisClientError::CommandError("EXISTS timed out".to_string()))??;

    Ok(exists)
}
