//! Trait contract tests for UserStore and AggregateSource.
//!
//! The in-memory fakes are exercised here; the MongoDB-backed test at the
//! bottom is ignored by default and needs a reachable server:
//!   MONGODB_URI=mongodb://localhost:27017/repodrop_test \
//!     cargo test -p repodrop-state --test trait_contracts -- --ignored

use std::time::Duration;

use repodrop_state::fakes::{MemoryAggregateSource, MemoryUserStore};
use repodrop_state::storage_traits::*;
use repodrop_state::{MongoConfig, MongoHandle, StateError, UserRecord};
use serde_json::json;

// ===========================================================================
// UserStore contract tests
// ===========================================================================

#[tokio::test]
async fn user_store_find_after_create() {
    let store = MemoryUserStore::new();
    let user = UserRecord::new("carol", "carol@example.com", "s3cret").unwrap();
    store.create_user(user.clone()).await.unwrap();

    let found = store.find_by_username("carol").await.unwrap().unwrap();
    assert_eq!(found, user);
    assert!(found.check_password("s3cret"));
}

#[tokio::test]
async fn user_store_find_missing_is_none() {
    let store = MemoryUserStore::new();
    assert!(store.find_by_username("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn user_store_duplicate_username_rejected() {
    let store = MemoryUserStore::new();
    store
        .create_user(UserRecord::new("dave", "d1@example.com", "a").unwrap())
        .await
        .unwrap();
    let err = store
        .create_user(UserRecord::new("dave", "d2@example.com", "b").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, StateError::Duplicate(_)));
}

#[tokio::test]
async fn user_store_delete_all_reports_count() {
    let store = MemoryUserStore::new();
    for name in ["u1", "u2", "u3"] {
        store
            .create_user(UserRecord::new(name, "x@example.com", "pw").unwrap())
            .await
            .unwrap();
    }

    assert_eq!(store.delete_all().await.unwrap(), 3);
    assert!(store.is_empty());
    assert_eq!(store.delete_all().await.unwrap(), 0);
}

// ===========================================================================
// AggregateSource contract tests
// ===========================================================================

#[tokio::test]
async fn aggregate_empty_collection_is_empty_not_error() {
    let source = MemoryAggregateSource::new(Vec::new());
    let out = source
        .aggregate(vec![json!({"$sort": {"username": 1}})], Duration::from_secs(1))
        .await
        .unwrap();
    assert!(out.is_empty());
}

#[tokio::test]
async fn aggregate_failure_surfaces_query_error() {
    let source = MemoryAggregateSource::new(Vec::new()).failing("boom");
    let err = source
        .aggregate(vec![json!({"$limit": 1})], Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, StateError::Query(m) if m == "boom"));
}

// ===========================================================================
// MongoDB-backed contract (requires a server)
// ===========================================================================

#[tokio::test]
#[ignore]
async fn mongo_handle_round_trip() {
    dotenvy::dotenv().ok();
    let handle = MongoHandle::connect(&MongoConfig::from_env())
        .await
        .expect("MongoDB reachable");

    handle.delete_all().await.unwrap();
    handle
        .create_user(UserRecord::new("erin", "erin@example.com", "pw").unwrap())
        .await
        .unwrap();

    let found = handle.find_by_username("erin").await.unwrap().unwrap();
    assert_eq!(found.email, "erin@example.com");

    let docs = handle
        .aggregate(
            vec![json!({"$project": {"username": 1, "_id": 0}}), json!({"$limit": 2})],
            Duration::from_secs(4),
        )
        .await
        .unwrap();
    assert_eq!(docs, vec![json!({"username": "erin"})]);

    assert_eq!(handle.delete_all().await.unwrap(), 1);
}
