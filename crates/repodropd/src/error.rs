//! HTTP error responses.
//!
//! Account and upload routes answer `{"success": false, "error": ...}`; the
//! search route answers `{"message": ...}`. Both map the core error kinds onto
//! the same status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use repodrop_core::{ErrorKind, FilterError, IntakeError};
use repodrop_state::StateError;

fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::SecurityPolicy => StatusCode::BAD_REQUEST,
        ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::Operational => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Errors from the account and upload routes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Storage(#[from] StateError),

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn io(context: &'static str, source: std::io::Error) -> Self {
        ApiError::Io { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Intake(IntakeError::SubmoduleFailed { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Intake(e) => status_for_kind(e.kind()),
            ApiError::Storage(StateError::InvalidRecord(_) | StateError::Duplicate(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Storage(_) | ApiError::Io { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text shown to the caller.
    pub fn client_message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Authentication required".to_string(),
            ApiError::InvalidCredentials => "Invalid username or password".to_string(),
            ApiError::BadRequest(message) => message.clone(),
            ApiError::Intake(e) => e.client_message(),
            ApiError::Storage(StateError::Duplicate(_)) => "Username already exists".to_string(),
            ApiError::Storage(StateError::InvalidRecord(reason)) => reason.clone(),
            ApiError::Storage(_) | ApiError::Io { .. } | ApiError::Internal(_) => {
                "Something went wrong".to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && !matches!(self, ApiError::Intake(_)) {
            error!(event = "api.error", error = %self);
        }
        let body = Json(json!({ "success": false, "error": self.client_message() }));
        (status, body).into_response()
    }
}

/// Errors from the search route.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("debug flag missing")]
    DebugRequired,

    #[error("non-loopback caller {client}")]
    LocalOnly { client: String },

    #[error("filter parameter missing")]
    MissingFilter,

    #[error("filter parameter is not JSON: {0}")]
    InvalidJson(String),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl SearchError {
    pub fn status(&self) -> StatusCode {
        match self {
            SearchError::DebugRequired | SearchError::MissingFilter | SearchError::InvalidJson(_) => {
                StatusCode::BAD_REQUEST
            }
            SearchError::LocalOnly { .. } => StatusCode::FORBIDDEN,
            SearchError::Filter(e) => status_for_kind(e.kind()),
        }
    }

    pub fn client_message(&self) -> &'static str {
        match self {
            SearchError::DebugRequired => "Debug mode required",
            SearchError::LocalOnly { .. } => "Access denied - localhost only",
            SearchError::MissingFilter => "Missing filter parameter",
            SearchError::InvalidJson(_) => "Invalid JSON in filter parameter",
            SearchError::Filter(e) => e.client_message(),
        }
    }
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "message": self.client_message() }));
        (self.status(), body).into_response()
    }
}
