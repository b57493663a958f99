/// Middleware modules for the API server
///
/// - `security`: Security response headers (tower `Layer`)
/// - `rate_limit`: Per-user token bucket backed by Redis

pub mod rate_limit;
pub mod security;
