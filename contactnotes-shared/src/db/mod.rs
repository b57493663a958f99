/// Database layer
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: schema migrations embedded from the workspace `migrations/` directory
///
/// Table models live in the crate-level `models` module.

pub mod migrations;
pub mod pool;
