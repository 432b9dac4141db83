//! Cookie sessions backed by an in-process map.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "repodrop_session";

/// Who a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub username: String,
}

/// Shared map from session id to [`Session`].
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, session: Session) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.write().await.insert(id, session);
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<Session> {
        self.inner.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &Uuid) -> Option<Session> {
        self.inner.write().await.remove(id)
    }

    /// Drop every session. Returns how many there were.
    pub async fn clear(&self) -> usize {
        let mut sessions = self.inner.write().await;
        let count = sessions.len();
        sessions.clear();
        count
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Session id from the request's `Cookie` headers, if well formed.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

pub fn session_cookie(id: &Uuid) -> String {
    format!("{SESSION_COOKIE}={id}; HttpOnly; Path=/; SameSite=Lax")
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

/// The caller's session, or [`ApiError::Unauthorized`].
pub async fn require_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(Uuid, Session), ApiError> {
    let id = session_id_from_headers(headers).ok_or(ApiError::Unauthorized)?;
    let session = state.sessions.get(&id).await.ok_or(ApiError::Unauthorized)?;
    Ok((id, session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_cookie_parsing() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={id}; other=1")).unwrap(),
        );
        assert_eq!(session_id_from_headers(&headers), Some(id));
    }

    #[test]
    fn test_malformed_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("repodrop_session=not-a-uuid"),
        );
        assert_eq!(session_id_from_headers(&headers), None);
        assert_eq!(session_id_from_headers(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_store_lifecycle() {
        let store = SessionStore::new();
        let id = store
            .create(Session {
                user_id: "u1".into(),
                username: "alice".into(),
            })
            .await;
        assert_eq!(store.get(&id).await.unwrap().username, "alice");
        assert_eq!(store.clear().await, 1);
        assert!(store.get(&id).await.is_none());
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = session_cookie(&Uuid::nil());
        assert!(cookie.starts_with("repodrop_session="));
        assert!(cookie.contains("HttpOnly"));
        assert!(expired_session_cookie().contains("Max-Age=0"));
    }
}
