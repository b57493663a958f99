/// Redis list implementation of the task queue

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

use super::{QueueError, TaskHandle, TaskMessage, TaskQueue, QUEUE_KEY};
use crate::redis::RedisClient;

/// Producer that LPUSHes JSON messages
#[derive(Clone)]
pub struct RedisTaskQueue {
    client: RedisClient,
    key: String,
}

impl RedisTaskQueue {
    pub fn new(client: RedisClient) -> Self {
        Self::with_key(client, QUEUE_KEY)
    }

    /// Uses a custom list key, mainly for isolating tests
    pub fn with_key(client: RedisClient, key: impl Into<String>) -> Self {
        Self {
            client,
            key: key.into(),
        }
    }
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    async fn submit(&self, task_name: &str, note_id: i64) -> Result<TaskHandle, QueueError> {
        let message = TaskMessage::new(task_name, note_id);
        let payload = serde_json::to_string(&message)?;

        let mut conn = self.client.get_connection();
        let depth: i64 = tokio::time::timeout(
            self.client.config().command_timeout(),
            conn.lpush(&self.key, payload),
        )
        .await
        .map_err(|_| QueueError::Command("LPUSH timed out".to_string()))??;

        tracing::debug!(
            task_id = %message.id,
            task = %message.task,
            note_id,
            depth,
            "Task enqueued"
        );

        Ok(message.handle())
    }
}

/// Consumer that BRPOPs from the task list on its own connection
pub struct RedisTaskReceiver {
    conn: ConnectionManager,
    key: String,
}

impl RedisTaskReceiver {
    /// Opens a dedicated connection for blocking pops
    pub async fn connect(client: &RedisClient) -> Result<Self, QueueError> {
        Self::connect_with_key(client, QUEUE_KEY).await
    }

    pub async fn connect_with_key(
        client: &RedisClient,
        key: impl Into<String>,
    ) -> Result<Self, QueueError> {
        let conn = client
            .dedicated_connection()
            .await
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;

        Ok(Self {
            conn,
            key: key.into(),
        })
    }

    /// Pops the oldest message, waiting up to `timeout`
    ///
    /// Returns `Ok(None)` when the wait elapses with an empty list. A message
    /// that is not valid JSON is consumed and reported as
    /// `QueueError::Serialization`.
    pub async fn pop(&mut self, timeout: Duration) -> Result<Option<TaskMessage>, QueueError> {
        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(&self.key)
            .arg(timeout.as_secs().max(1))
            .query_async(&mut self.conn)
            .await?;

        match popped {
            Some((_, payload)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::PROCESS_NOTE_TASK;
    use crate::redis::RedisConfig;

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_submit_then_pop_fifo() {
        let key = format!("contactnotes:test:queue:{}", uuid::Uuid::new_v4());
        let client = RedisClient::new(RedisConfig::default_for_test()).await.unwrap();
        let queue = RedisTaskQueue::with_key(client.clone(), key.clone());
        let mut receiver = RedisTaskReceiver::connect_with_key(&client, key.clone())
            .await
            .unwrap();

        let first = queue.submit(PROCESS_NOTE_TASK, 1).await.unwrap();
        let second = queue.submit(PROCESS_NOTE_TASK, 2).await.unwrap();

        let popped = receiver.pop(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(popped.id, first.id);
        assert_eq!(popped.note_id, 1);

        let popped = receiver.pop(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(popped.id, second.id);

        assert!(receiver.pop(Duration::from_secs(1)).await.unwrap().is_none());
    }
}
