/// Request authentication primitives for Axum
///
/// The API's auth layer calls [`authenticate_bearer`] on each protected
/// request and, after its revocation check, inserts the resulting
/// [`AuthContext`] into the request extensions.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use contactnotes_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}", auth.user_id)
/// }
/// ```

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, Claims, JwtError};

/// Authentication context added to request extensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: i64,

    /// `jti` of the presented token
    pub token_id: Uuid,

    /// When the presented token expires
    pub expires_at: DateTime<Utc>,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            token_id: claims.jti,
            expires_at: claims.expires_at(),
        }
    }

    /// Seconds left before the token expires, at least 1
    pub fn remaining_ttl_secs(&self) -> u64 {
        let remaining = (self.expires_at - Utc::now()).num_seconds();
        remaining.max(1) as u64
    }
}

/// Error type for request authentication
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Authorization header is not a Bearer token
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),

    /// Token was revoked by logout
    Revoked,
}

/// Extracts the token from an `Authorization: Bearer <token>` header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Validates the bearer access token of a request
///
/// Refresh tokens are rejected here. Revocation is checked by the caller.
pub fn authenticate_bearer(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = extract_bearer_token(headers)?;

    let claims = validate_access_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::WrongType { .. } => AuthError::InvalidToken("Access token required".to_string()),
        _ => AuthError::InvalidToken("Invalid token".to_string()),
    })?;

    Ok(AuthContext::from_claims(&claims))
}
