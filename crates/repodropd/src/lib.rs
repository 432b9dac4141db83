//! Repodrop HTTP service.
//!
//! Wires the intake and search pipelines from `repodrop-core` to an axum
//! router with cookie sessions, static pages and a background reaper.

pub mod app;
pub mod error;
pub mod reaper;
pub mod routes;
pub mod session;

pub use app::{build_router, AppState, ServiceSettings, MAX_UPLOAD_BYTES};
pub use error::{ApiError, SearchError};
pub use reaper::{spawn_reaper, sweep, SweepReport};
pub use session::{Session, SessionStore, SESSION_COOKIE};
