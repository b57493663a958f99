//! Router-level tests
//!
//! Tests marked `#[ignore]` need PostgreSQL at `DATABASE_URL`:
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/contactnotes_test cargo test -p contactnotes-api -- --ignored
//! ```

mod common;

use axum::http::{Method, StatusCode};
use common::{send, test_config, FailingQueue, RecordingQueue, TestContext, TEST_SECRET};
use contactnotes_api::app::{build_router, AppState};
use contactnotes_shared::auth::jwt::{create_token, Claims, TokenType};
use contactnotes_shared::models::note::Note;
use contactnotes_shared::queue::{UnavailableTaskQueue, PROCESS_NOTE_TASK};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

fn offline_app() -> axum::Router {
    let config = test_config();
    let pool = PgPool::connect_lazy(&config.database.url).unwrap();
    build_router(AppState::new(pool, config, Arc::new(UnavailableTaskQueue), None))
}

#[tokio::test]
async fn test_root_message() {
    let (status, body) = send(&offline_app(), Method::GET, "/", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Server is running!"}));
}

#[tokio::test]
async fn test_notes_require_authentication() {
    let (status, body) = send(
        &offline_app(),
        Method::POST,
        "/contacts/1/notes",
        None,
        Some(json!({"body": "hello"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let (status, _) = send(
        &offline_app(),
        Method::GET,
        "/contacts",
        Some("not.a.jwt"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_without_fields_is_bad_request() {
    let (status, body) = send(
        &offline_app(),
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"username": "ada"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Username and password required");
}

#[tokio::test]
async fn test_contact_field_errors_are_not_reported_as_missing_name() {
    let token = create_token(&Claims::new(1, TokenType::Access), TEST_SECRET).unwrap();
    let app = offline_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/contacts",
        Some(&token),
        Some(json!({"name": "Ada", "email": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_ne!(body["message"], "Name is required");

    let (status, body) = send(
        &app,
        Method::POST,
        "/contacts",
        Some(&token),
        Some(json!({"name": "  ", "email": "ada@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Name is required");
}

#[tokio::test]
async fn test_refresh_with_invalid_token() {
    let (status, _) = send(
        &offline_app(),
        Method::POST,
        "/auth/refresh",
        None,
        Some(json!({"refresh_token": "garbage"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_register_and_login() {
    let pool = PgPool::connect(&test_config().database.url).await.unwrap();
    contactnotes_shared::db::migrations::run_migrations(&pool).await.unwrap();
    let app = offline_app();
    let username = format!("ada-{}", uuid::Uuid::new_v4());
    let credentials = json!({"username": username, "password": "correct horse"});

    let (status, body) = send(&app, Method::POST, "/auth/register", None, Some(credentials.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User created successfully");
    let user_id = body["user_id"].as_i64().unwrap();

    let (status, _) = send(&app, Method::POST, "/auth/register", None, Some(credentials.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, tokens) = send(&app, Method::POST, "/auth/login", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(tokens["access_token"].is_string());
    assert!(tokens["refresh_token"].is_string());

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"username": username, "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, refreshed) = send(
        &app,
        Method::POST,
        "/auth/refresh",
        None,
        Some(json!({"refresh_token": tokens["refresh_token"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(refreshed["access_token"].is_string());

    contactnotes_shared::models::user::User::delete(&pool, user_id)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_create_note_enqueues_processing() {
    let queue = Arc::new(RecordingQueue::default());
    let ctx = TestContext::new(queue.clone()).await.unwrap();

    let (status, contact) = ctx
        .request(Method::POST, "/contacts", Some(json!({"name": "Ada"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let contact_id = contact["id"].as_i64().unwrap();

    let (status, note) = ctx
        .request(
            Method::POST,
            &format!("/contacts/{}/notes", contact_id),
            Some(json!({"note_text": "Call back on Monday"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(note["body"], "Call back on Monday");
    let note_id = note["id"].as_i64().unwrap();

    let stored = Note::find_by_id(&ctx.db, note_id).await.unwrap().unwrap();
    assert_eq!(stored.body, "Call back on Monday");
    assert_eq!(queue.submitted(), vec![(PROCESS_NOTE_TASK.to_string(), note_id)]);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_create_note_survives_queue_failure() {
    let ctx = TestContext::new(Arc::new(FailingQueue)).await.unwrap();

    let (_, contact) = ctx
        .request(Method::POST, "/contacts", Some(json!({"name": "Grace"})))
        .await;
    let uri = format!("/contacts/{}/notes", contact["id"]);

    let (status, note) = ctx.request(Method::POST, &uri, Some(json!({"body": "hi"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(note["id"].is_i64());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_note_validation_messages() {
    let ctx = TestContext::new(Arc::new(RecordingQueue::default())).await.unwrap();

    let (status, body) = ctx
        .request(Method::POST, "/contacts/999999999/notes", Some(json!({"body": "x"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Contact not found");

    let (_, contact) = ctx
        .request(Method::POST, "/contacts", Some(json!({"name": "Linus"})))
        .await;
    let uri = format!("/contacts/{}/notes", contact["id"]);

    let (status, body) = ctx.request(Method::POST, &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No data provided");

    let (status, body) = ctx.request(Method::POST, &uri, Some(json!({"title": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Note content is required");

    let (_, note) = ctx.request(Method::POST, &uri, Some(json!({"body": "first"}))).await;
    let note_uri = format!("{}/{}", uri, note["id"]);

    let (status, body) = ctx.request(Method::PUT, &note_uri, Some(json!({"body": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Note body is required");

    let (status, body) = ctx
        .request(Method::PUT, &note_uri, Some(json!({"note_body": "second"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["body"], "second");

    let (status, body) = ctx.request(Method::DELETE, &note_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Note deleted successfully");

    let (status, body) = ctx.request(Method::GET, &note_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Note not found");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_contact_crud_and_cascade() {
    let ctx = TestContext::new(Arc::new(RecordingQueue::default())).await.unwrap();

    let (status, body) = ctx.request(Method::POST, "/contacts", Some(json!({"email": "x@y.z"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Name is required");

    let (_, contact) = ctx
        .request(
            Method::POST,
            "/contacts",
            Some(json!({"name": "Ada", "email": "ada@example.com"})),
        )
        .await;
    let contact_uri = format!("/contacts/{}", contact["id"]);

    let (status, updated) = ctx
        .request(Method::PUT, &contact_uri, Some(json!({"email": null})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Ada");
    assert!(updated["email"].is_null());

    let (_, note) = ctx
        .request(
            Method::POST,
            &format!("{}/notes", contact_uri),
            Some(json!({"body": "gone soon"})),
        )
        .await;
    let note_id = note["id"].as_i64().unwrap();

    let (status, body) = ctx.request(Method::DELETE, &contact_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Contact deleted successfully");

    assert!(Note::find_by_id(&ctx.db, note_id).await.unwrap().is_none());

    let (status, body) = ctx.request(Method::GET, &contact_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Contact not found");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_contacts_are_private() {
    let owner = TestContext::new(Arc::new(RecordingQueue::default())).await.unwrap();
    let other = TestContext::new(Arc::new(RecordingQueue::default())).await.unwrap();

    let (_, contact) = owner
        .request(Method::POST, "/contacts", Some(json!({"name": "Secret"})))
        .await;
    let uri = format!("/contacts/{}", contact["id"]);

    let (status, _) = other.request(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = other.request(Method::GET, "/contacts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));

    owner.cleanup().await.unwrap();
    other.cleanup().await.unwrap();
}
