/// JWT token generation and validation module
///
/// Tokens are signed using HS256 (HMAC-SHA256). Each token carries a unique
/// `jti` so it can be revoked individually on logout.
///
/// # Token Types
///
/// - **Access Token**: lifetime configured by the API (default 1 hour)
/// - **Refresh Token**: 30 days, only usable to mint new access tokens
///
/// # Example
///
/// ```
/// use contactnotes_shared::auth::jwt::{create_token, validate_token, Claims, TokenType};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let claims = Claims::new(42, TokenType::Access);
/// let token = create_token(&claims, "your-secret-key-at-least-32-bytes")?;
///
/// let validated = validate_token(&token, "your-secret-key-at-least-32-bytes")?;
/// assert_eq!(validated.sub, 42);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim stamped on every token
pub const ISSUER: &str = "contactnotes";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token has the wrong type for this use
    #[error("Expected {expected} token, got {actual} token")]
    WrongType { expected: &'static str, actual: &'static str },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    /// Default lifetime when the caller does not configure one
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(1),
            TokenType::Refresh => Duration::days(30),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims structure
///
/// - `sub`: user ID
/// - `iss`: always [`ISSUER`]
/// - `iat` / `nbf` / `exp`: Unix timestamps
/// - `jti`: unique token ID, the revocation handle
/// - `token_type`: access or refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub jti: Uuid,
    pub token_type: TokenType,
}

impl Claims {
    /// Creates new claims with the token type's default expiration
    pub fn new(user_id: i64, token_type: TokenType) -> Self {
        Self::with_expiration(user_id, token_type, token_type.default_expiration())
    }

    /// Creates claims with custom expiration
    ///
    /// ```
    /// use contactnotes_shared::auth::jwt::{Claims, TokenType};
    /// use chrono::Duration;
    ///
    /// let claims = Claims::with_expiration(1, TokenType::Access, Duration::minutes(15));
    /// assert!(!claims.is_expired());
    /// ```
    pub fn with_expiration(user_id: i64, token_type: TokenType, expires_in: Duration) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Gets time until expiration, `None` once expired
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now().timestamp();
        if self.exp > now {
            Some(Duration::seconds(self.exp - now))
        } else {
            None
        }
    }

    /// Expiration as a timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Signs claims into a token string
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a JWT token and extracts claims
///
/// Verifies the signature, `exp`, `nbf` and the issuer.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

fn validate_typed(token: &str, secret: &str, expected: TokenType) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != expected {
        return Err(JwtError::WrongType {
            expected: expected.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    Ok(claims)
}

/// Validates token and checks it's an access token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Access)
}

/// Validates token and checks it's a refresh token
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Refresh)
}

/// Mints a new access token from a valid refresh token
///
/// The new token gets a fresh `jti` and the given lifetime.
pub fn refresh_access_token(
    refresh_token: &str,
    secret: &str,
    access_ttl: Duration,
) -> Result<String, JwtError> {
    let refresh_claims = validate_refresh_token(refresh_token, secret)?;
    let access_claims = Claims::with_expiration(refresh_claims.sub, TokenType::Access, access_ttl);

    create_token(&access_claims, secret)
}
