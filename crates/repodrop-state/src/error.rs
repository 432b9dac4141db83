//! Error types for repodrop-state

use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;

/// Server error code for `maxTimeMS` expiry.
const MAX_TIME_MS_EXPIRED: i32 = 50;

/// Server error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

/// Errors that can occur in the persistence layer
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// The server aborted an operation that exceeded its time budget
    #[error("Database operation exceeded its time limit: {0}")]
    Timeout(String),

    /// A record with the same unique key already exists
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// A record failed field validation before reaching the database
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Password hashing or verification error
    #[error("Credential hashing failed: {0}")]
    Credential(String),
}

impl StateError {
    /// Returns `true` when the failure was the server enforcing a time budget.
    pub fn is_timeout(&self) -> bool {
        matches!(self, StateError::Timeout(_))
    }
}

impl From<mongodb::error::Error> for StateError {
    fn from(err: mongodb::error::Error) -> Self {
        match *err.kind {
            ErrorKind::Command(ref command) if command.code == MAX_TIME_MS_EXPIRED => {
                StateError::Timeout(command.message.clone())
            }
            ErrorKind::Write(WriteFailure::WriteError(ref write)) if write.code == DUPLICATE_KEY => {
                StateError::Duplicate(write.message.clone())
            }
            ErrorKind::ServerSelection { ref message, .. } => {
                StateError::Connection(message.clone())
            }
            _ => StateError::Query(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Serialization(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for StateError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        StateError::Serialization(err.to_string())
    }
}
