//! Persistent record shapes.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Maximum username length accepted at signup.
pub const MAX_USERNAME_LEN: usize = 80;

/// Maximum email length accepted at signup.
pub const MAX_EMAIL_LEN: usize = 120;

/// A registered account, stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    /// Argon2id PHC string; never the plaintext password.
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Build a record for a new account, hashing `password`.
    ///
    /// Enforces the username/email length limits and rejects empty fields.
    pub fn new(username: &str, email: &str, password: &str) -> Result<Self, StateError> {
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(StateError::InvalidRecord(
                "username, email and password are required".to_string(),
            ));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(StateError::InvalidRecord(format!(
                "username longer than {MAX_USERNAME_LEN} characters"
            )));
        }
        if email.chars().count() > MAX_EMAIL_LEN {
            return Err(StateError::InvalidRecord(format!(
                "email longer than {MAX_EMAIL_LEN} characters"
            )));
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password: hash_password(password)?,
            created_at: Utc::now(),
        })
    }

    /// Check `candidate` against the stored hash.
    pub fn check_password(&self, candidate: &str) -> bool {
        verify_password(&self.password, candidate)
    }
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, StateError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StateError::Credential(e.to_string()))
}

/// Verify `candidate` against a PHC hash string. Malformed hashes never verify.
pub fn verify_password(hash: &str, candidate: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_is_hashed_and_verifies() {
        let user = UserRecord::new("alice", "alice@example.com", "hunter2").unwrap();
        assert_ne!(user.password, "hunter2");
        assert!(user.password.starts_with("$argon2"));
        assert!(user.check_password("hunter2"));
        assert!(!user.check_password("hunter3"));
    }

    #[test]
    fn test_rejects_missing_fields() {
        let err = UserRecord::new("", "a@example.com", "pw").unwrap_err();
        assert!(matches!(err, StateError::InvalidRecord(_)));
    }

    #[test]
    fn test_rejects_long_username() {
        let name = "x".repeat(MAX_USERNAME_LEN + 1);
        assert!(UserRecord::new(&name, "a@example.com", "pw").is_err());
    }

    #[test]
    fn test_rejects_long_email() {
        let email = format!("{}@example.com", "e".repeat(MAX_EMAIL_LEN));
        assert!(UserRecord::new("bob", &email, "pw").is_err());
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("not-a-phc-string", "anything"));
    }

    #[test]
    fn test_ids_are_unique() {
        let a = UserRecord::new("a", "a@example.com", "pw").unwrap();
        let b = UserRecord::new("b", "b@example.com", "pw").unwrap();
        assert_ne!(a.id, b.id);
    }
}
