//! `POST /api/upload`: authenticated archive intake.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::session::require_session;

const FILE_FIELD: &str = "file";
const MAX_FILENAME_CHARS: usize = 255;
const ALLOWED_EXTENSIONS: &[&str] = &["zip"];

const TOO_LARGE: &str = "File size exceeds 1MB limit";
const INVALID_TYPE: &str = "Invalid file type. Only ZIP files are allowed.";

/// Client-supplied file names must be bare `*.zip` names.
pub fn allowed_file(filename: &str) -> bool {
    if filename.is_empty() {
        return false;
    }
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return false;
    }
    let Some((_, extension)) = filename.rsplit_once('.') else {
        return false;
    };
    let extension = extension.trim().to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return false;
    }
    filename.chars().count() <= MAX_FILENAME_CHARS
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::bad_request(TOO_LARGE)
    } else {
        ApiError::bad_request(format!("Invalid upload: {}", err.body_text()))
    }
}

pub async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let (_, session) = require_session(&state, &headers).await?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some((filename, data));
        break;
    }

    let Some((filename, data)) = upload else {
        return Err(ApiError::bad_request("No file part"));
    };
    if filename.is_empty() {
        return Err(ApiError::bad_request("No selected file"));
    }
    if data.len() > state.settings.max_upload_bytes {
        return Err(ApiError::bad_request(TOO_LARGE));
    }
    if !allowed_file(&filename) {
        return Err(ApiError::bad_request(INVALID_TYPE));
    }

    let user_dir = state.settings.upload_dir.join(&session.user_id);
    tokio::fs::create_dir_all(&user_dir)
        .await
        .map_err(|e| ApiError::io("creating upload directory", e))?;

    let stored = tempfile::Builder::new()
        .prefix("upload_")
        .suffix(".zip")
        .tempfile_in(&user_dir)
        .map_err(|e| ApiError::io("creating upload file", e))?;
    tokio::fs::write(stored.path(), &data)
        .await
        .map_err(|e| ApiError::io("saving upload", e))?;

    info!(
        event = "upload.received",
        username = %session.username,
        filename = %filename,
        bytes = data.len(),
    );

    let result = state.intake.process(stored.path(), &user_dir).await;
    drop(stored);

    let success = result?;
    Ok(Json(json!({ "success": true, "message": success.message })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_file() {
        assert!(allowed_file("repo.zip"));
        assert!(allowed_file("Repo.ZIP"));
        assert!(allowed_file("my.project.zip"));

        assert!(!allowed_file(""));
        assert!(!allowed_file("repo"));
        assert!(!allowed_file("repo.tar.gz"));
        assert!(!allowed_file("../repo.zip"));
        assert!(!allowed_file("dir/repo.zip"));
        assert!(!allowed_file("dir\\repo.zip"));
        assert!(!allowed_file("a..zip"));
    }

    #[test]
    fn test_filename_length_limit() {
        let long = format!("{}.zip", "a".repeat(251));
        assert_eq!(long.len(), 255);
        assert!(allowed_file(&long));
        let too_long = format!("{}.zip", "a".repeat(252));
        assert!(!allowed_file(&too_long));
    }
}
