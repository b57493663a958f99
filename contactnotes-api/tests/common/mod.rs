//! Shared helpers for the API integration tests
//!
//! - `TestContext`: database, router and a signed-in user
//! - `RecordingQueue` / `FailingQueue`: `TaskQueue` fakes
//! - `send`: one request through the router, JSON in and out

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use contactnotes_api::app::{build_router, AppState};
use contactnotes_api::config::Config;
use contactnotes_shared::auth::jwt::{create_token, Claims, TokenType};
use contactnotes_shared::db::migrations::run_migrations;
use contactnotes_shared::models::user::{CreateUser, User};
use contactnotes_shared::queue::{QueueError, TaskHandle, TaskMessage, TaskQueue};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test configuration; only `DATABASE_URL` comes from the environment
pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some(
            std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/contactnotes_test".to_string()),
        ),
        "JWT_SECRET" => Some(TEST_SECRET.to_string()),
        _ => None,
    })
    .expect("test config")
}

/// Queue that accepts everything and remembers what it was given
#[derive(Default)]
pub struct RecordingQueue {
    pub submitted: Mutex<Vec<(String, i64)>>,
}

impl RecordingQueue {
    pub fn submitted(&self) -> Vec<(String, i64)> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn submit(&self, task_name: &str, note_id: i64) -> Result<TaskHandle, QueueError> {
        self.submitted
            .lock()
            .unwrap()
            .push((task_name.to_string(), note_id));
        Ok(TaskMessage::new(task_name, note_id).handle())
    }
}

/// Queue whose broker is always down
pub struct FailingQueue;

#[async_trait]
impl TaskQueue for FailingQueue {
    async fn submit(&self, _task_name: &str, _note_id: i64) -> Result<TaskHandle, QueueError> {
        Err(QueueError::Command("connection refused".to_string()))
    }
}

pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
    pub user: User,
    pub token: String,
}

impl TestContext {
    /// Connects, migrates and signs in a fresh user
    pub async fn new(queue: Arc<dyn TaskQueue>) -> anyhow::Result<Self> {
        let config = test_config();
        let db = PgPool::connect(&config.database.url).await?;
        run_migrations(&db).await?;

        let user = User::create(
            &db,
            CreateUser {
                username: format!("test-{}", Uuid::new_v4()),
                password_hash: "not-a-real-hash".to_string(),
            },
        )
        .await?;

        let token = create_token(&Claims::new(user.id, TokenType::Access), TEST_SECRET)?;
        let app = build_router(AppState::new(db.clone(), config, queue, None));

        Ok(Self {
            db,
            app,
            user,
            token,
        })
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send(&self.app, method, uri, Some(&self.token), body).await
    }

    /// Removes the user; contacts and notes go with it
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        User::delete(&self.db, self.user.id).await?;
        Ok(())
    }
}

/// Sends one request and decodes the JSON response (`Null` for empty bodies)
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, value)
}
