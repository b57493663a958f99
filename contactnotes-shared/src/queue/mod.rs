/// Background task queue
///
/// The API submits tasks after committing a note; worker processes pop them
/// and run the registered handler. Messages are JSON on a Redis list:
///
/// ```text
/// API ──LPUSH──> contactnotes:queue:tasks ──BRPOP──> worker
/// ```
///
/// Delivery is at-most-once once popped: a worker that dies after `BRPOP`
/// loses that task. Submitting the same note twice yields two tasks.
///
/// # Example
///
/// ```no_run
/// use contactnotes_shared::queue::{RedisTaskQueue, TaskQueue, PROCESS_NOTE_TASK};
/// use contactnotes_shared::redis::{RedisClient, RedisConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = RedisClient::new(RedisConfig::with_url("redis://localhost:6379")).await?;
/// let queue = RedisTaskQueue::new(client);
///
/// let handle = queue.submit(PROCESS_NOTE_TASK, 42).await?;
/// println!("queued {} as {}", handle.task, handle.id);
/// # Ok(())
/// # }
/// ```

pub mod broker;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use broker::{RedisTaskQueue, RedisTaskReceiver};

/// Redis list holding pending tasks
pub const QUEUE_KEY: &str = "contactnotes:queue:tasks";

/// Name of the note post-processing task
pub const PROCESS_NOTE_TASK: &str = "process_note";

/// Task queue errors
#[derive(Debug, Error)]
pub enum QueueError {
    /// No broker is configured for this process
    #[error("Task queue unavailable: {0}")]
    Unavailable(String),

    /// Broker command failed
    #[error("Task queue command failed: {0}")]
    Command(String),

    /// Message could not be encoded or decoded
    #[error("Invalid task message: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        QueueError::Command(err.to_string())
    }
}

/// Message placed on the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMessage {
    /// Unique task ID, also the result key suffix
    pub id: Uuid,

    /// Registered handler name, e.g. `process_note`
    pub task: String,

    /// Note the task operates on
    pub note_id: i64,

    pub enqueued_at: DateTime<Utc>,
}

impl TaskMessage {
    pub fn new(task: impl Into<String>, note_id: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            task: task.into(),
            note_id,
            enqueued_at: Utc::now(),
        }
    }

    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            id: self.id,
            task: self.task.clone(),
        }
    }
}

/// Receipt returned by a successful submit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub id: Uuid,
    pub task: String,
}

/// Producer side of the queue
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Submits a task for `note_id`
    ///
    /// Returns once the broker has accepted the message, not when the task runs.
    async fn submit(&self, task_name: &str, note_id: i64) -> Result<TaskHandle, QueueError>;
}

/// Queue used when no broker is configured
///
/// Every submit fails, so callers log the dropped task the same way they
/// would log a broker outage.
#[derive(Debug, Clone, Default)]
pub struct UnavailableTaskQueue;

#[async_trait]
impl TaskQueue for UnavailableTaskQueue {
    async fn submit(&self, task_name: &str, _note_id: i64) -> Result<TaskHandle, QueueError> {
        Err(QueueError::Unavailable(format!(
            "no broker configured, dropping {}",
            task_name
        )))
    }
}
