//! Storage subsystem
//!
//! This module provides the abstraction and implementation for persisting captured attempts.
//!
//! Components:
//! - `storage_trait`: the Storage trait defining a uniform async API.
//! - `types`: attempt records, insert candidates and their validation, aggregates.
//! - `database_storage`: SQLite implementation using sqlx.

pub mod database_storage;
pub mod storage_trait;
pub mod types;

pub use database_storage::SqliteStorage;
pub use storage_trait::Storage;
