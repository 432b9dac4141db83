//! Shared state and routing.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use repodrop_core::{FilterPolicy, RepoIntake};
use repodrop_state::{AggregateSource, UserStore};

use crate::routes;
use crate::session::SessionStore;

/// Largest accepted upload (1 MiB).
pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024;

/// Body limit on the upload route; leaves room for multipart framing so the
/// size check can answer with its own message.
const UPLOAD_BODY_LIMIT: usize = 2 * MAX_UPLOAD_BYTES;

/// Filesystem and timing settings for the service.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Root of the per-user upload directories.
    pub upload_dir: PathBuf,
    /// Served under `/static`.
    pub static_dir: PathBuf,
    /// HTML pages served by `/` and `/:page`.
    pub template_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Reaper cadence, also the maximum age of an upload entry.
    pub reaper_interval: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            static_dir: PathBuf::from("static"),
            template_dir: PathBuf::from("templates"),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            reaper_interval: Duration::from_secs(600),
        }
    }
}

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub records: Arc<dyn AggregateSource>,
    pub sessions: SessionStore,
    pub intake: Arc<RepoIntake>,
    pub filter_policy: Arc<FilterPolicy>,
    pub settings: Arc<ServiceSettings>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        records: Arc<dyn AggregateSource>,
        intake: RepoIntake,
        filter_policy: FilterPolicy,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            users,
            records,
            sessions: SessionStore::new(),
            intake: Arc::new(intake),
            filter_policy: Arc::new(filter_policy),
            settings: Arc::new(settings),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.settings.static_dir);

    Router::new()
        .route("/api/signup", post(routes::auth::signup))
        .route("/api/signin", post(routes::auth::signin))
        .route("/api/logout", post(routes::auth::logout))
        .route("/api/profile", get(routes::auth::profile))
        .route(
            "/api/upload",
            post(routes::upload::upload_file).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/search", get(routes::search::search))
        .route("/", get(routes::pages::index))
        .route("/:page", get(routes::pages::page))
        .nest_service("/static", static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
