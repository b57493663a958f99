/// Note processor
///
/// Handles `process_note` tasks: loads the note in its own transaction,
/// delivers it upstream and reports a structured result. Nothing escapes as
/// an error; every outcome becomes one of:
///
/// ```json
/// {"status": "success", "note_id": 12}
/// {"status": "error", "note_id": 12, "error": "Note not found"}
/// ```

use async_trait::async_trait;
use contactnotes_shared::models::note::Note;
use contactnotes_shared::queue::{TaskMessage, PROCESS_NOTE_TASK};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;

use crate::handler::TaskHandler;
use crate::upstream::UpstreamNotifier;

/// Outcome of processing one note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProcessingResult {
    Success { note_id: i64 },
    Error { note_id: i64, error: String },
}

impl ProcessingResult {
    pub fn error(note_id: i64, error: impl Into<String>) -> Self {
        ProcessingResult::Error {
            note_id,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProcessingResult::Success { .. })
    }

    pub fn to_value(&self) -> Value {
        match self {
            ProcessingResult::Success { note_id } => {
                serde_json::json!({ "status": "success", "note_id": note_id })
            }
            ProcessingResult::Error { note_id, error } => {
                serde_json::json!({ "status": "error", "note_id": note_id, "error": error })
            }
        }
    }
}

/// Where the processor reads notes from
#[async_trait]
pub trait NoteSource: Send + Sync {
    async fn fetch_note(&self, note_id: i64) -> Result<Option<Note>, sqlx::Error>;
}

/// PostgreSQL note source
///
/// Each read runs in its own transaction. The transaction is committed on
/// success and rolled back when dropped on any other path.
#[derive(Clone)]
pub struct PgNoteSource {
    pool: PgPool,
}

impl PgNoteSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteSource for PgNoteSource {
    async fn fetch_note(&self, note_id: i64) -> Result<Option<Note>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let note = Note::find_by_id(&mut *tx, note_id).await?;
        tx.commit().await?;
        Ok(note)
    }
}

pub struct NoteProcessor {
    notes: Arc<dyn NoteSource>,
    notifier: UpstreamNotifier,
}

impl NoteProcessor {
    pub fn new(notes: Arc<dyn NoteSource>, notifier: UpstreamNotifier) -> Self {
        Self { notes, notifier }
    }

    /// Processes one note id
    pub async fn process(&self, note_id: i64) -> ProcessingResult {
        tracing::info!(note_id, "Processing note");

        let note = match self.notes.fetch_note(note_id).await {
            Ok(Some(note)) => note,
            Ok(None) => {
                tracing::warn!(note_id, "Note not found");
                return ProcessingResult::error(note_id, "Note not found");
            }
            Err(e) => {
                tracing::error!(note_id, error = %e, "Failed to load note");
                return ProcessingResult::error(note_id, e.to_string());
            }
        };

        match self.notifier.notify(note.id, &note.body).await {
            Ok(reply) => {
                tracing::info!(note_id, reply = %reply, "Note processed");
                ProcessingResult::Success { note_id }
            }
            Err(e) => {
                tracing::error!(note_id, error = %e, "Note processing failed");
                ProcessingResult::error(note_id, e.to_string())
            }
        }
    }
}

#[async_trait]
impl TaskHandler for NoteProcessor {
    fn name(&self) -> &str {
        PROCESS_NOTE_TASK
    }

    async fn handle(&self, task: &TaskMessage) -> Value {
        self.process(task.note_id).await.to_value()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::upstream::testing::{ok, timed_out, ScriptedTransport};
    use crate::upstream::{RetryPolicy, UpstreamError};
    use serde_json::json;
    use std::time::Duration;

    fn processor(notes: Arc<dyn NoteSource>, transport: Arc<ScriptedTransport>) -> NoteProcessor {
        let notifier = UpstreamNotifier::new(transport, "http://upstream.test", RetryPolicy::default());
        NoteProcessor::new(notes, notifier)
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_note_skips_upstream() {
        let transport = Arc::new(ScriptedTransport::default());
        let processor = processor(Arc::new(MemoryNotes::default()), transport.clone());

        let result = processor.process(9999).await;

        assert_eq!(
            result.to_value(),
            json!({"status": "error", "note_id": 9999, "error": "Note not found"})
        );
        assert!(transport.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_first_try() {
        let transport = Arc::new(ScriptedTransport::new(vec![ok("{}")]));
        let processor = processor(Arc::new(MemoryNotes::with_note(5, "remember milk")), transport.clone());

        let result = processor.process(5).await;

        assert_eq!(result.to_value(), json!({"status": "success", "note_id": 5}));
        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].payload, json!({"note_id": 5, "body": "remember milk"}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_timeouts_then_success() {
        let transport = Arc::new(ScriptedTransport::new(vec![timed_out(), timed_out(), ok("")]));
        let processor = processor(Arc::new(MemoryNotes::with_note(8, "ping")), transport.clone());

        let result = processor.process(8).await;

        assert!(result.is_success());
        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| c.payload == json!({"note_id": 8, "body": "ping"})
            && c.timeout == Duration::from_secs(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_become_error_result() {
        let failure = || Err(UpstreamError::Transport("connection refused".to_string()));
        let transport = Arc::new(ScriptedTransport::new(vec![failure(), failure(), failure()]));
        let processor = processor(Arc::new(MemoryNotes::with_note(2, "x")), transport.clone());

        let result = processor.process(2).await;

        assert_eq!(
            result,
            ProcessingResult::error(2, "Upstream transport error: connection refused")
        );
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_json_reply_becomes_error_result() {
        let page = || ok("<html>gateway</html>");
        let transport = Arc::new(ScriptedTransport::new(vec![page(), page(), page()]));
        let processor = processor(Arc::new(MemoryNotes::with_note(5, "x")), transport.clone());

        let result = processor.process(5).await;

        assert!(!result.is_success());
        assert_eq!(result.to_value()["status"], "error");
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_store_error_becomes_error_result() {
        let transport = Arc::new(ScriptedTransport::default());
        let processor = processor(Arc::new(BrokenNotes), transport.clone());

        let result = processor.process(1).await;

        assert!(!result.is_success());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_handler_uses_task_note_id() {
        let notes = Arc::new(MemoryNotes::default());
        let processor = processor(notes.clone(), Arc::new(ScriptedTransport::default()));

        assert_eq!(processor.name(), "process_note");
        let value = processor.handle(&TaskMessage::new(PROCESS_NOTE_TASK, 31)).await;

        assert_eq!(value["note_id"], json!(31));
        assert_eq!(notes.lookups.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_result_serde_matches_to_value() {
        let result = ProcessingResult::error(4, "boom");
        assert_eq!(serde_json::to_value(&result).unwrap(), result.to_value());

        let result = ProcessingResult::Success { note_id: 4 };
        assert_eq!(serde_json::to_value(&result).unwrap(), result.to_value());
    }
}
