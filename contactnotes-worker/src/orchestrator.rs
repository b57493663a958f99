/// Worker orchestrator
///
/// Pops tasks from the queue, dispatches each to the handler registered for
/// its name and writes the handler's result to the result backend.
///
/// # Architecture
///
/// ```text
/// Orchestrator
///   ├─> Semaphore: wait for a free slot
///   ├─> TaskConsumer: BRPOP the next message (bounded wait)
///   ├─> Handler registry: look up handler by task name
///   ├─> tokio::spawn: handler.handle(task), holding the slot
///   └─> ResultStore: SETEX the result payload
/// ```
///
/// # Concurrency
///
/// At most `concurrency` tasks run at once. A slot is acquired before popping,
/// so messages stay on the queue while all slots are busy. A slot is held for
/// the whole task, retry waits included.
///
/// # Shutdown
///
/// Cancelling the shutdown token stops the loop from popping; `run` then
/// waits for every in-flight task to release its slot.
///
/// # Example
///
/// ```no_run
/// use contactnotes_shared::queue::RedisTaskReceiver;
/// use contactnotes_shared::redis::{RedisClient, RedisConfig};
/// use contactnotes_worker::orchestrator::{OrchestratorConfig, WorkerOrchestrator};
/// use contactnotes_worker::results::RedisResultStore;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let redis = RedisClient::new(RedisConfig::with_url("redis://localhost:6379")).await?;
/// let consumer = RedisTaskReceiver::connect(&redis).await?;
/// let results = Arc::new(RedisResultStore::new(redis, 86400));
///
/// let mut orchestrator =
///     WorkerOrchestrator::new(Box::new(consumer), results, OrchestratorConfig::default());
/// orchestrator.run().await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use contactnotes_shared::queue::{QueueError, RedisTaskReceiver, TaskMessage};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::handler::TaskHandler;
use crate::results::ResultStore;

/// Pause after a failed pop before trying again
const POP_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Consumer side of the queue
#[async_trait]
pub trait TaskConsumer: Send {
    /// Waits up to `timeout` for the next message; `Ok(None)` if none arrived
    async fn next_task(&mut self, timeout: Duration) -> Result<Option<TaskMessage>, QueueError>;
}

#[async_trait]
impl TaskConsumer for RedisTaskReceiver {
    async fn next_task(&mut self, timeout: Duration) -> Result<Option<TaskMessage>, QueueError> {
        self.pop(timeout).await
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum concurrently running tasks
    pub concurrency: usize,

    /// Longest single blocking pop
    pub poll_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            concurrency: 4,
            poll_timeout: Duration::from_secs(5),
        }
    }
}

pub struct WorkerOrchestrator {
    consumer: Box<dyn TaskConsumer>,
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
    results: Arc<dyn ResultStore>,
    config: OrchestratorConfig,
    slots: Arc<Semaphore>,
    shutdown_token: CancellationToken,
}

impl WorkerOrchestrator {
    pub fn new(
        consumer: Box<dyn TaskConsumer>,
        results: Arc<dyn ResultStore>,
        config: OrchestratorConfig,
    ) -> Self {
        let concurrency = config.concurrency.max(1);

        WorkerOrchestrator {
            consumer,
            handlers: HashMap::new(),
            results,
            slots: Arc::new(Semaphore::new(concurrency)),
            config: OrchestratorConfig {
                concurrency,
                ..config
            },
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Registers a handler under its own name, replacing any previous one
    pub fn register_handler(&mut self, handler: Arc<dyn TaskHandler>) {
        let name = handler.name().to_string();
        tracing::info!(task = %name, "Registering task handler");
        self.handlers.insert(name, handler);
    }

    /// Token that stops the loop when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs the worker loop until shutdown
    ///
    /// Returns the number of tasks dispatched.
    pub async fn run(&mut self) -> anyhow::Result<u64> {
        tracing::info!(
            concurrency = self.config.concurrency,
            handlers = ?self.handlers.keys().collect::<Vec<_>>(),
            "Worker orchestrator starting"
        );

        let mut dispatched = 0u64;

        loop {
            let permit = tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => break,
                permit = self.slots.clone().acquire_owned() => permit?,
            };

            // an interrupted pop may drop a message already taken off the list
            let next = tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => break,
                next = self.consumer.next_task(self.config.poll_timeout) => next,
            };

            match next {
                Ok(Some(task)) => {
                    dispatched += 1;
                    self.dispatch(task, permit);
                }
                Ok(None) => continue,
                Err(QueueError::Serialization(e)) => {
                    tracing::error!(error = %e, "Discarding malformed task message");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to pop task");
                    drop(permit);
                    tokio::select! {
                        biased;
                        _ = self.shutdown_token.cancelled() => break,
                        _ = tokio::time::sleep(POP_ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        tracing::info!("Shutdown requested, waiting for in-flight tasks");
        let _all = self
            .slots
            .acquire_many(self.config.concurrency as u32)
            .await?;

        tracing::info!(dispatched, "Worker orchestrator shut down");
        Ok(dispatched)
    }

    /// Spawns one task; the permit is released when it finishes
    fn dispatch(&self, task: TaskMessage, permit: tokio::sync::OwnedSemaphorePermit) {
        let handler = self.handlers.get(&task.task).cloned();
        let results = self.results.clone();

        tokio::spawn(async move {
            let _permit = permit;

            let result = match handler {
                Some(handler) => {
                    tracing::info!(
                        task_id = %task.id,
                        task = %task.task,
                        note_id = task.note_id,
                        "Executing task"
                    );
                    handler.handle(&task).await
                }
                None => {
                    tracing::error!(task_id = %task.id, task = %task.task, "No handler registered");
                    unknown_task_result(&task)
                }
            };

            tracing::info!(task_id = %task.id, result = %result, "Task finished");

            if let Err(e) = results.store(task.id, &result).await {
                tracing::error!(task_id = %task.id, error = %e, "Failed to store task result");
            }
        });
    }
}

fn unknown_task_result(task: &TaskMessage) -> Value {
    json!({
        "status": "error",
        "note_id": task.note_id,
        "error": format!("Unknown task: {}", task.task),
    })
}
