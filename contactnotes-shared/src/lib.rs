//! # Contact Notes Shared Library
//!
//! This crate contains the types and persistence logic shared by the
//! Contact Notes API server and the note-processing worker.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users, contacts, notes) and their queries
//! - `db`: Connection pool and migrations
//! - `auth`: Password hashing, JWT tokens, request auth context, token revocation
//! - `redis`: Redis client wrapper
//! - `queue`: Task queue messages and the Redis-backed queue

pub mod auth;
pub mod db;
pub mod models;
pub mod queue;
pub mod redis;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
