//! Account routes: signup, signin, logout, profile.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use repodrop_state::UserRecord;

use crate::app::AppState;
use crate::error::ApiError;
use crate::session::{expired_session_cookie, require_session, session_cookie, Session};

#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SigninRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}

/// Run password hashing or verification on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("credential task failed: {e}")))
}

pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let (Some(username), Some(email), Some(password)) = (
        non_empty(request.username),
        non_empty(request.email),
        non_empty(request.password),
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };

    if state.users.find_by_username(&username).await?.is_some() {
        return Err(ApiError::bad_request("Username already exists"));
    }

    let record = blocking(move || UserRecord::new(&username, &email, &password)).await??;
    let username = record.username.clone();
    state.users.create_user(record).await?;
    info!(event = "account.created", username = %username);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Account created successfully! Please sign in."
        })),
    )
        .into_response())
}

pub async fn signin(
    State(state): State<AppState>,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let (Some(username), Some(password)) =
        (non_empty(request.username), non_empty(request.password))
    else {
        return Err(ApiError::bad_request("Username and password are required"));
    };

    let Some(user) = state.users.find_by_username(&username).await? else {
        return Err(ApiError::InvalidCredentials);
    };
    let (user, verified) = blocking(move || {
        let ok = user.check_password(&password);
        (user, ok)
    })
    .await?;
    if !verified {
        return Err(ApiError::InvalidCredentials);
    }

    let session_id = state
        .sessions
        .create(Session {
            user_id: user.id.clone(),
            username: user.username.clone(),
        })
        .await;
    info!(event = "account.signin", username = %user.username);

    Ok((
        [(SET_COOKIE, session_cookie(&session_id))],
        Json(json!({
            "success": true,
            "message": "Login successful!",
            "username": user.username
        })),
    )
        .into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let (session_id, _) = require_session(&state, &headers).await?;
    state.sessions.remove(&session_id).await;

    Ok((
        [(SET_COOKIE, expired_session_cookie())],
        Json(json!({ "success": true, "message": "You have been logged out." })),
    )
        .into_response())
}

pub async fn profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (_, session) = require_session(&state, &headers).await?;
    Ok(Json(json!({ "success": true, "username": session.username })))
}
