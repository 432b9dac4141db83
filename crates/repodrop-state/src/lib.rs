//! Repodrop-State: MongoDB Backend for Repodrop
//!
//! Persistence for the intake service: account records behind the session
//! gate, and a read-only aggregation seam the record search runs through.
//!
//! ## Key Components
//!
//! - `MongoHandle`: connection, index setup, trait implementations
//! - `UserRecord`: account schema with Argon2id password hashes
//! - `UserStore` / `AggregateSource`: backend-agnostic traits
//! - `fakes`: in-memory implementations for tests

mod error;
pub mod fakes;
mod handle;
pub mod models;
pub mod storage_traits;

pub use error::StateError;
pub use handle::{MongoConfig, MongoHandle, DEFAULT_MONGODB_URI, USERS_COLLECTION};
pub use models::UserRecord;
pub use storage_traits::{AggregateSource, StorageResult, UserStore};

/// Result type for repodrop-state operations
pub type Result<T> = std::result::Result<T, StateError>;
