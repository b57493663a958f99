/// Note endpoints, nested under a contact
///
/// Bodies may carry the text as `body`, `note_body` or `note_text`.
///
/// Creating a note submits a `process_note` task after the insert commits.
/// Submission is best effort: a failure is logged and the note is still
/// returned with 201.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::contacts::CONTACT_NOT_FOUND,
};
use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use contactnotes_shared::{
    auth::middleware::AuthContext,
    models::{
        contact::Contact,
        note::{normalize_note_data, CreateNote, Note},
    },
    queue::PROCESS_NOTE_TASK,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const NOTE_NOT_FOUND: &str = "Note not found";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoteResponse {
    pub id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            body: note.body,
            created_at: note.created_at,
        }
    }
}

/// Returns the payload unless it is missing, unparseable, `null` or `{}`
fn provided(payload: Result<Json<Value>, JsonRejection>) -> Option<Value> {
    let Json(value) = payload.ok()?;
    match &value {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        _ => Some(value),
    }
}

async fn require_contact(state: &AppState, contact_id: i64, user_id: i64) -> ApiResult<Contact> {
    Contact::find_for_user(&state.db, contact_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(CONTACT_NOT_FOUND.to_string()))
}

/// Create a note and queue it for processing
///
/// # Errors
///
/// - `404 Not Found`: Contact missing or not owned by the caller
/// - `400 Bad Request`: "No data provided" / "Note content is required"
pub async fn create_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(contact_id): Path<i64>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<NoteResponse>)> {
    require_contact(&state, contact_id, auth.user_id).await?;

    let data = provided(payload)
        .ok_or_else(|| ApiError::BadRequest("No data provided".to_string()))?;

    let body = normalize_note_data(Some(&data))
        .body
        .ok_or_else(|| ApiError::BadRequest("Note content is required".to_string()))?;

    let note = Note::create(&state.db, CreateNote { contact_id, body }).await?;

    match state.queue.submit(PROCESS_NOTE_TASK, note.id).await {
        Ok(handle) => {
            tracing::info!(note_id = note.id, task_id = %handle.id, "Queued note for processing");
        }
        Err(e) => {
            tracing::error!(error = %e, note_id = note.id, "Failed to queue note processing task");
        }
    }

    Ok((StatusCode::CREATED, Json(note.into())))
}

pub async fn list_notes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(contact_id): Path<i64>,
) -> ApiResult<Json<Vec<NoteResponse>>> {
    require_contact(&state, contact_id, auth.user_id).await?;

    let notes = Note::list_by_contact(&state.db, contact_id).await?;

    Ok(Json(notes.into_iter().map(Into::into).collect()))
}

pub async fn get_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((contact_id, note_id)): Path<(i64, i64)>,
) -> ApiResult<Json<NoteResponse>> {
    let note = Note::find_for_user(&state.db, note_id, contact_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOTE_NOT_FOUND.to_string()))?;

    Ok(Json(note.into()))
}

/// Replace a note's body
///
/// The note must exist before the body is checked, so an unknown note is a
/// 404 even with an empty payload.
pub async fn update_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((contact_id, note_id)): Path<(i64, i64)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<NoteResponse>> {
    Note::find_for_user(&state.db, note_id, contact_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOTE_NOT_FOUND.to_string()))?;

    let data = payload.ok().map(|Json(value)| value);
    let body = normalize_note_data(data.as_ref())
        .body
        .ok_or_else(|| ApiError::BadRequest("Note body is required".to_string()))?;

    // Deleted between the lookup and the update
    let note = Note::update_body_for_user(&state.db, note_id, contact_id, auth.user_id, &body)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOTE_NOT_FOUND.to_string()))?;

    Ok(Json(note.into()))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((contact_id, note_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    if !Note::delete_for_user(&state.db, note_id, contact_id, auth.user_id).await? {
        return Err(ApiError::NotFound(NOTE_NOT_FOUND.to_string()));
    }

    Ok(Json(json!({ "message": "Note deleted successfully" })))
}
