//! HTML pages.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use tracing::warn;

use crate::app::AppState;

const PAGES: &[&str] = &["signin", "signup", "profile", "why"];

async fn render(state: &AppState, name: &str) -> Result<Html<String>, StatusCode> {
    let path = state.settings.template_dir.join(format!("{name}.html"));
    tokio::fs::read_to_string(&path).await.map(Html).map_err(|e| {
        warn!(path = %path.display(), error = %e, "template unavailable");
        StatusCode::NOT_FOUND
    })
}

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    render(&state, "index").await
}

/// Known pages by name; anything else gets the index page.
pub async fn page(
    State(state): State<AppState>,
    Path(page): Path<String>,
) -> Result<Html<String>, StatusCode> {
    let name = PAGES
        .iter()
        .copied()
        .find(|known| *known == page)
        .unwrap_or("index");
    render(&state, name).await
}
