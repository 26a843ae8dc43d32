//! Storage Trait
//!
//! This module defines the `Storage` trait, the boundary behind which captured attempts are
//! persisted and queried.
//!
//! Implementors of this trait are responsible for:
//! - Assigning the identifier and capture timestamp of every inserted attempt
//! - Keeping timestamps non-decreasing across inserts
//! - Listing attempts newest first
//! - Aggregating totals
//!
//! All methods return a `Result` to handle potential storage errors.

use async_trait::async_trait;

use crate::error_handling::types::StorageError;
use crate::storage::types::{Attempt, NewAttempt, Stats};

#[async_trait]
pub trait Storage: Send + Sync {
    /// Appends an already validated attempt and returns the stored row.
    async fn insert(&self, attempt: NewAttempt) -> Result<Attempt, StorageError>;

    /// Returns the window `[skip, skip + limit)` of attempts ordered by timestamp descending.
    async fn list(&self, skip: u64, limit: u64) -> Result<Vec<Attempt>, StorageError>;

    /// Counts all attempts and distinct source addresses.
    async fn stats(&self) -> Result<Stats, StorageError>;

    /// Cheap round-trip used by health checks.
    async fn ping(&self) -> Result<(), StorageError>;
}
