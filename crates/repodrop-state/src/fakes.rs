//! In-memory fakes for storage traits (testing only)
//!
//! `MemoryUserStore` and `MemoryAggregateSource` satisfy the trait contracts
//! without a running MongoDB.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StateError;
use crate::models::UserRecord;
use crate::storage_traits::{AggregateSource, StorageResult, UserStore};

// ---------------------------------------------------------------------------
// MemoryUserStore
// ---------------------------------------------------------------------------

/// In-memory account store keyed by username.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: UserRecord) -> StorageResult<()> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.username) {
            return Err(StateError::Duplicate(format!("username {}", user.username)));
        }
        users.insert(user.username.clone(), user);
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> StorageResult<Option<UserRecord>> {
        Ok(self.users.lock().unwrap().get(username).cloned())
    }

    async fn delete_all(&self) -> StorageResult<u64> {
        let mut users = self.users.lock().unwrap();
        let removed = users.len() as u64;
        users.clear();
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// MemoryAggregateSource
// ---------------------------------------------------------------------------

/// Canned aggregation backend.
///
/// Returns its stored documents, honouring only `$limit` stages. Every
/// pipeline it receives is recorded for later inspection. A configured delay
/// simulates a slow backend; a configured failure simulates a broken one.
#[derive(Debug, Default)]
pub struct MemoryAggregateSource {
    documents: Vec<serde_json::Value>,
    delay: Option<Duration>,
    failure: Option<String>,
    seen: Mutex<Vec<Vec<serde_json::Value>>>,
}

impl MemoryAggregateSource {
    pub fn new(documents: Vec<serde_json::Value>) -> Self {
        Self {
            documents,
            ..Self::default()
        }
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call with a query error carrying `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Pipelines received so far, in call order.
    pub fn pipelines(&self) -> Vec<Vec<serde_json::Value>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl AggregateSource for MemoryAggregateSource {
    async fn aggregate(
        &self,
        pipeline: Vec<serde_json::Value>,
        _max_time: Duration,
    ) -> StorageResult<Vec<serde_json::Value>> {
        self.seen.lock().unwrap().push(pipeline.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(StateError::Query(message.clone()));
        }

        let limit = pipeline
            .iter()
            .filter_map(|stage| stage.get("$limit").and_then(serde_json::Value::as_u64))
            .min()
            .map(|n| n as usize)
            .unwrap_or(usize::MAX);

        Ok(self.documents.iter().take(limit).cloned().collect())
    }
}
