//! Storage trait definitions for Repodrop
//!
//! - `UserStore`: account records behind the session gate and the reaper
//! - `AggregateSource`: read-only aggregation over the searchable collection
//!
//! Both traits are async and backend-agnostic. In-memory fakes live in the
//! `fakes` module.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StateError;
use crate::models::UserRecord;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StateError>;

/// Account persistence.
///
/// Guarantees:
/// - `username` is unique; a second `create_user` with the same name fails
///   with `StateError::Duplicate`.
/// - `delete_all` removes every record and reports how many were removed.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account.
    async fn create_user(&self, user: UserRecord) -> StorageResult<()>;

    /// Look up an account by its unique username.
    async fn find_by_username(&self, username: &str) -> StorageResult<Option<UserRecord>>;

    /// Remove every account. Returns the number of records deleted.
    async fn delete_all(&self) -> StorageResult<u64>;
}

/// Read-only aggregation over a single collection.
///
/// Stages arrive as JSON documents and results leave as relaxed extended
/// JSON, so callers never handle driver types. `max_time` is forwarded to the
/// backend as its own execution budget; callers still enforce a wall-clock
/// limit of their own.
#[async_trait]
pub trait AggregateSource: Send + Sync {
    async fn aggregate(
        &self,
        pipeline: Vec<serde_json::Value>,
        max_time: Duration,
    ) -> StorageResult<Vec<serde_json::Value>>;
}
