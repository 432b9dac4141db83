//! Periodic purge of accounts, sessions and stale uploads.
//!
//! Started once at startup and never joined. Each pass deletes every user
//! record, drops every session, and removes upload entries whose modification
//! time is older than the interval. Failures are logged and the loop goes on.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use repodrop_core::obs;
use repodrop_state::UserStore;

use crate::session::SessionStore;

/// Counts from one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub users_deleted: u64,
    pub sessions_dropped: usize,
    pub uploads_removed: usize,
}

/// Remove every entry directly under `upload_dir` last modified before
/// `now - max_age`. A missing directory counts as empty.
pub fn remove_stale_uploads(
    upload_dir: &Path,
    max_age: Duration,
    now: SystemTime,
) -> std::io::Result<usize> {
    let entries = match std::fs::read_dir(upload_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let meta = entry.metadata()?;
        let age = meta
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < max_age {
            continue;
        }

        let path = entry.path();
        let result = if meta.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        match result {
            Ok(()) => removed += 1,
            Err(e) => obs::emit_reaper_error("remove_upload", &format!("{}: {e}", path.display())),
        }
    }
    Ok(removed)
}

/// One reaper pass.
pub async fn sweep(
    users: &dyn UserStore,
    sessions: &SessionStore,
    upload_dir: &Path,
    max_age: Duration,
) -> SweepReport {
    let mut report = SweepReport::default();

    match users.delete_all().await {
        Ok(deleted) => report.users_deleted = deleted,
        Err(e) => obs::emit_reaper_error("delete_users", &e),
    }
    report.sessions_dropped = sessions.clear().await;

    let dir = upload_dir.to_path_buf();
    match tokio::task::spawn_blocking(move || {
        remove_stale_uploads(&dir, max_age, SystemTime::now())
    })
    .await
    {
        Ok(Ok(removed)) => report.uploads_removed = removed,
        Ok(Err(e)) => obs::emit_reaper_error("scan_uploads", &e),
        Err(e) => obs::emit_reaper_error("scan_uploads", &e),
    }

    obs::emit_reaper_sweep(report.users_deleted, report.uploads_removed);
    report
}

/// Spawn the reaper loop. The first pass runs immediately.
pub fn spawn_reaper(
    users: Arc<dyn UserStore>,
    sessions: SessionStore,
    upload_dir: PathBuf,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sweep(users.as_ref(), &sessions, &upload_dir, interval).await;
        }
    })
}
