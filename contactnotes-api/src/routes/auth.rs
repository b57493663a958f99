/// Authentication endpoints
///
/// - `POST /auth/register` - Create a user
/// - `POST /auth/login` - Exchange credentials for access and refresh tokens
/// - `POST /auth/refresh` - Exchange a refresh token for a new access token
/// - `POST /auth/logout` - Revoke the presented access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::present,
};
use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    http::StatusCode,
    Json,
};
use contactnotes_shared::{
    auth::{jwt, middleware::AuthContext, password, revocation},
    models::user::{CreateUser, User},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

const CREDENTIALS_REQUIRED: &str = "Username and password required";
const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        required(message = "Username and password required"),
        length(max = 80, message = "Username must be at most 80 characters")
    )]
    pub username: Option<String>,

    #[validate(required(message = "Username and password required"))]
    pub password: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Register a new user
///
/// ```text
/// POST /auth/register
/// {"username": "ada", "password": "correct horse"}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing username or password
/// - `409 Conflict`: Username already exists
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(req) = payload?;
    let req = RegisterRequest {
        username: present(req.username),
        password: present(req.password),
    };
    req.validate()?;

    let (Some(username), Some(plain)) = (req.username, req.password) else {
        return Err(ApiError::BadRequest(CREDENTIALS_REQUIRED.to_string()));
    };

    let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| ApiError::InternalError(format!("Hashing task failed: {}", e)))??;

    let user = User::create(
        &state.db,
        CreateUser {
            username,
            password_hash,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "user_id": user.id,
        })),
    ))
}

/// Login
///
/// ```text
/// POST /auth/login
/// {"username": "ada", "password": "correct horse"}
/// ```
///
/// Unknown users and wrong passwords get the same 401.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(req) = payload?;

    let (Some(username), Some(plain)) = (present(req.username), present(req.password)) else {
        return Err(ApiError::BadRequest(CREDENTIALS_REQUIRED.to_string()));
    };

    let user = User::find_by_username(&state.db, &username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || password::verify_password(&plain, &hash))
        .await
        .map_err(|e| ApiError::InternalError(format!("Verification task failed: {}", e)))??;

    if !valid {
        tracing::debug!(user_id = user.id, "Login rejected");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let access_claims = jwt::Claims::with_expiration(
        user.id,
        jwt::TokenType::Access,
        state.config.access_token_ttl(),
    );
    let refresh_claims = jwt::Claims::new(user.id, jwt::TokenType::Refresh);

    Ok(Json(LoginResponse {
        access_token: jwt::create_token(&access_claims, state.jwt_secret())?,
        refresh_token: jwt::create_token(&refresh_claims, state.jwt_secret())?,
    }))
}

/// Token refresh
///
/// ```text
/// POST /auth/refresh
/// {"refresh_token": "eyJ..."}
/// ```
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<RefreshResponse>> {
    let Json(req) = payload?;
    let refresh_token = present(req.refresh_token)
        .ok_or_else(|| ApiError::BadRequest("Refresh token required".to_string()))?;

    let access_token = jwt::refresh_access_token(
        &refresh_token,
        state.jwt_secret(),
        state.config.access_token_ttl(),
    )?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Logout
///
/// Revokes the presented token until it would have expired anyway. Without
/// Redis the token stays valid and the call still succeeds.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Json<Value> {
    match state.redis.as_ref() {
        Some(redis) => {
            if let Err(e) =
                revocation::revoke_token(redis, auth.token_id, auth.remaining_ttl_secs()).await
            {
                tracing::warn!(error = %e, user_id = auth.user_id, "Failed to revoke token");
            }
        }
        None => {
            tracing::warn!(user_id = auth.user_id, "Redis not configured, token revocation skipped");
        }
    }

    Json(json!({ "message": "Successfully logged out" }))
}
