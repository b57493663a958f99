/// Task result backend
///
/// Each finished task's JSON result is written to
/// `contactnotes:result:{task_id}` with a TTL (24h by default). Callers log
/// and ignore store failures; a lost result never fails the task.

use async_trait::async_trait;
use contactnotes_shared::redis::{RedisClient, RedisClientError};
use serde_json::Value;
use uuid::Uuid;

pub const RESULT_KEY_PREFIX: &str = "contactnotes:result:";

pub fn result_key(task_id: Uuid) -> String {
    format!("{}{}", RESULT_KEY_PREFIX, task_id)
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn store(&self, task_id: Uuid, result: &Value) -> Result<(), RedisClientError>;
}

/// Redis `SETEX` result store
#[derive(Clone)]
pub struct RedisResultStore {
    client: RedisClient,
    ttl_secs: u64,
}

impl RedisResultStore {
    pub fn new(client: RedisClient, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }
}

#[async_trait]
impl ResultStore for RedisResultStore {
    async fn store(&self, task_id: Uuid, result: &Value) -> Result<(), RedisClientError> {
        let payload = serde_json::to_string(result)
            .map_err(|e| RedisClientError::CommandError(e.to_string()))?;

        let mut conn = self.client.get_connection();
        let _: () = tokio::time::timeout(
            self.client.config().command_timeout(),
            redis::cmd("SETEX")
                .arg(result_key(task_id))
                .arg(self.ttl_secs)
                .arg(payload)
                .query_async(&mut conn),
        )
        .await
        .map_err(|_| RedisClientError::CommandError("SETEX timed out".to_string()))??;

        Ok(())
    }
}
