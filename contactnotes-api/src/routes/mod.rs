/// API route handlers
///
/// Organized by resource:
///
/// - `health`: Liveness message and health check
/// - `auth`: Register, login, refresh, logout
/// - `contacts`: Contact CRUD for the authenticated user
/// - `notes`: Notes under a contact; creation enqueues background processing

pub mod auth;
pub mod contacts;
pub mod health;
pub mod notes;

/// Treats blank strings as missing
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
