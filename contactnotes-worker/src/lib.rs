//! # Contact Notes Worker Library
//!
//! Background processing for notes: pops tasks enqueued by the API, runs the
//! registered handler and records each task's result.
//!
//! ## Modules
//!
//! - `config`: Worker configuration from the environment
//! - `orchestrator`: Pop/dispatch loop with bounded concurrency
//! - `handler`: `TaskHandler` trait implemented by task types
//! - `processor`: The `process_note` handler
//! - `upstream`: Retrying HTTP delivery to the upstream notes service
//! - `results`: Result backend (Redis, 24h TTL)

pub mod config;
pub mod handler;
pub mod orchestrator;
pub mod processor;
pub mod results;
pub mod upstream;
