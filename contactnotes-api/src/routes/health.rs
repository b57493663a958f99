/// Health check endpoints
///
/// # Endpoints
///
/// ```text
/// GET /        -> {"message": "Server is running!"}
/// GET /health  -> {"status": "healthy", "version": "0.1.0", "database": "connected"}
/// ```
///
/// `/health` reports `degraded` rather than failing when the database is down.

use crate::app::AppState;
use axum::{extract::State, Json};
use contactnotes_shared::db::pool;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Server is running!" }))
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = match pool::health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: contactnotes_shared::VERSION.to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
    })
}
