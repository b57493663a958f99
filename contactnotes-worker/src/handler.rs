/// Task handler trait
///
/// A handler is registered with the orchestrator under [`TaskHandler::name`]
/// and receives every popped message whose `task` field matches.
///
/// Handlers do not return errors: every failure is expressed inside the JSON
/// result, which the orchestrator writes to the result backend.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use contactnotes_shared::queue::TaskMessage;
/// use contactnotes_worker::handler::TaskHandler;
/// use serde_json::{json, Value};
///
/// struct Echo;
///
/// #[async_trait]
/// impl TaskHandler for Echo {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     async fn handle(&self, task: &TaskMessage) -> Value {
///         json!({ "status": "success", "note_id": task.note_id })
///     }
/// }
/// ```

use async_trait::async_trait;
use contactnotes_shared::queue::TaskMessage;
use serde_json::Value;

#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Task name used for registry lookup and logging
    fn name(&self) -> &str;

    /// Runs the task to completion and returns its result payload
    async fn handle(&self, task: &TaskMessage) -> Value;
}
