/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: JWT access/refresh token generation and validation
/// - [`middleware`]: Bearer token extraction and the request `AuthContext`
/// - [`revocation`]: Redis-backed revoked token list used by logout
///
/// # Example
///
/// ```no_run
/// use contactnotes_shared::auth::password::{hash_password, verify_password};
/// use contactnotes_shared::auth::jwt::{create_token, Claims, TokenType};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(1, TokenType::Access);
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod revocation;
