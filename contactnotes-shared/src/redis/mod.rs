/// Redis integration
///
/// Redis backs several independent concerns, each keyed under the
/// `contactnotes:` prefix:
///
/// ```text
/// contactnotes:queue:tasks            list, LPUSH by the API / BRPOP by workers
/// contactnotes:result:{task_id}       task result payload (SETEX, 24h)
/// contactnotes:revoked:{jti}          revoked JWT ids (TTL = token lifetime)
/// contactnotes:ratelimit:user:{id}    token bucket state (hash, 120s expiry)
/// ```

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig};
