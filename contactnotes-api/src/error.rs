/// Error handling for the API server
///
/// Handlers return `ApiResult<T>`; every `ApiError` renders as
///
/// ```json
/// {"error": "not_found", "message": "Contact not found"}
/// ```
///
/// with validation failures adding a `details` list.
///
/// # Example
///
/// ```
/// use contactnotes_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(found: bool) -> ApiResult<Json<Value>> {
///     if !found {
///         return Err(ApiError::NotFound("Contact not found".to_string()));
///     }
///     Ok(Json(json!({ "ok": true })))
/// }
/// ```

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use contactnotes_shared::auth::{jwt::JwtError, middleware::AuthError, password::PasswordError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. duplicate username
    Conflict(String),

    /// Field validation failed (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Too many requests (429)
    RateLimitExceeded { retry_after: u64, message: String },

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "not_found")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::RateLimitExceeded { message, .. } => {
                write!(f, "Rate limit exceeded: {}", message)
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::RateLimitExceeded { retry_after, message } = self {
            let body = Json(ErrorResponse {
                error: "rate_limit_exceeded".to_string(),
                message,
                details: None,
            });

            let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
            response
                .headers_mut()
                .insert("Retry-After", HeaderValue::from(retry_after));
            return response;
        }

        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => {
                let message = errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "Request validation failed".to_string());
                (StatusCode::BAD_REQUEST, "validation_error", message, Some(errors))
            }
            ApiError::RateLimitExceeded { message, .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_exceeded",
                message,
                None,
            ),
            ApiError::InternalError(msg) => {
                // logged here, never sent to the client
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ValidationErrorDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field)),
                })
            })
            .collect();

        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                match db_err.constraint() {
                    Some(c) if c.contains("username") => {
                        ApiError::Conflict("Username already exists".to_string())
                    }
                    Some(c) => ApiError::Conflict(format!("Constraint violation: {}", c)),
                    None => ApiError::Conflict("Resource already exists".to_string()),
                }
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::Unauthorized("Missing credentials".to_string()),
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
            AuthError::Revoked => ApiError::Unauthorized("Token has been revoked".to_string()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::{json, Value};
    use validator::Validate;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("No data provided".to_string());
        assert_eq!(err.to_string(), "Bad request: No data provided");

        let err = ApiError::NotFound("Note not found".to_string());
        assert_eq!(err.to_string(), "Not found: Note not found");
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let response = ApiError::NotFound("Contact not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"error": "not_found", "message": "Contact not found"})
        );
    }

    #[tokio::test]
    async fn test_internal_error_is_opaque() {
        let response = ApiError::InternalError("password=hunter2".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_rate_limit_sets_retry_after() {
        let response = ApiError::RateLimitExceeded {
            retry_after: 12,
            message: "Slow down".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["Retry-After"], "12");
    }

    #[tokio::test]
    async fn test_auth_errors_map_to_status() {
        let cases = [
            (AuthError::MissingCredentials, StatusCode::UNAUTHORIZED, "unauthorized"),
            (
                AuthError::InvalidFormat("Expected Bearer token".to_string()),
                StatusCode::BAD_REQUEST,
                "bad_request",
            ),
            (
                AuthError::InvalidToken("Invalid token".to_string()),
                StatusCode::UNAUTHORIZED,
                "unauthorized",
            ),
            (AuthError::Revoked, StatusCode::UNAUTHORIZED, "unauthorized"),
        ];

        for (err, status, code) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
            assert_eq!(body_json(response).await["error"], code);
        }
    }

    #[derive(Validate)]
    struct Sample {
        #[validate(required(message = "Name is required"))]
        name: Option<String>,
    }

    #[tokio::test]
    async fn test_validation_errors_map_to_400() {
        let err: ApiError = Sample { name: None }.validate().unwrap_err().into();
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["message"], "Name is required");
        assert_eq!(body["details"][0]["field"], "name");
    }
}
