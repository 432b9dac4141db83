//! MongoDB Handle - Connection and Operations
//!
//! Owns the client and the `users` collection, and implements both storage
//! traits on top of them.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::{debug, info, instrument};

use crate::error::StateError;
use crate::models::UserRecord;
use crate::storage_traits::{AggregateSource, StorageResult, UserStore};
use crate::Result;

/// Connection string used when `MONGODB_URI` is unset.
pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017/repodrop";

/// Database used when the connection string names none.
pub const DEFAULT_DATABASE: &str = "repodrop";

/// Collection holding account records; also the search target.
pub const USERS_COLLECTION: &str = "users";

/// Connection settings for MongoDB
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoConfig {
    /// Connection string (e.g. "mongodb://localhost:27017/repodrop")
    pub uri: String,
    /// Database name override; falls back to the URI's default database
    pub database: Option<String>,
}

impl MongoConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: None,
        }
    }

    /// Set an explicit database name
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - MONGODB_URI (optional, default: "mongodb://localhost:27017/repodrop")
    /// - MONGODB_DATABASE (optional, default: the URI's database)
    pub fn from_env() -> Self {
        let uri = std::env::var("MONGODB_URI").unwrap_or_else(|_| DEFAULT_MONGODB_URI.to_string());
        let database = std::env::var("MONGODB_DATABASE").ok();
        Self { uri, database }
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MONGODB_URI)
    }
}

/// MongoDB connection handle for Repodrop
#[derive(Clone)]
pub struct MongoHandle {
    db: Database,
    users: Collection<UserRecord>,
    documents: Collection<Document>,
}

impl MongoHandle {
    /// Connect, verify the server answers, and ensure indexes exist.
    #[instrument(skip_all)]
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        let options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;
        let database = config
            .database
            .clone()
            .or_else(|| options.default_database.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let client =
            Client::with_options(options).map_err(|e| StateError::Connection(e.to_string()))?;
        let db = client.database(&database);

        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        let handle = Self {
            users: db.collection(USERS_COLLECTION),
            documents: db.collection(USERS_COLLECTION),
            db,
        };
        handle.init_indexes().await?;

        info!(database = %database, "MongoDB connected");
        Ok(handle)
    }

    /// Connect using environment variables
    pub async fn from_env() -> Result<Self> {
        Self::connect(&MongoConfig::from_env()).await
    }

    /// Name of the connected database
    pub fn database_name(&self) -> &str {
        self.db.name()
    }

    async fn init_indexes(&self) -> Result<()> {
        debug!("Ensuring unique username index");
        let index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users.create_index(index).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoHandle {
    async fn create_user(&self, user: UserRecord) -> StorageResult<()> {
        self.users.insert_one(&user).await?;
        debug!(username = %user.username, "user created");
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> StorageResult<Option<UserRecord>> {
        Ok(self.users.find_one(doc! { "username": username }).await?)
    }

    async fn delete_all(&self) -> StorageResult<u64> {
        let result = self.users.delete_many(doc! {}).await?;
        Ok(result.deleted_count)
    }
}

#[async_trait]
impl AggregateSource for MongoHandle {
    async fn aggregate(
        &self,
        pipeline: Vec<serde_json::Value>,
        max_time: Duration,
    ) -> StorageResult<Vec<serde_json::Value>> {
        let stages = pipeline
            .iter()
            .map(mongodb::bson::to_document)
            .collect::<std::result::Result<Vec<Document>, _>>()?;

        let cursor = self.documents.aggregate(stages).max_time(max_time).await?;
        let results: Vec<Document> = cursor.try_collect().await?;

        Ok(results
            .into_iter()
            .map(|document| Bson::Document(document).into_relaxed_extjson())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MongoConfig::default();
        assert_eq!(config.uri, DEFAULT_MONGODB_URI);
        assert!(config.database.is_none());
    }

    #[test]
    fn test_config_with_database() {
        let config = MongoConfig::new("mongodb://db:27017").with_database("intake");
        assert_eq!(config.database.as_deref(), Some("intake"));
    }
}
