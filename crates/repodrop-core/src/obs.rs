//! Structured observability hooks for intake and search lifecycle events.
//!
//! Every emitter logs with a stable `event = "..."` field so log pipelines can
//! key on it. Rejections of adversarial or malformed input log at `warn!`;
//! operational faults log at `error!` with full detail.

use tracing::{error, info, warn};

use crate::error::{ErrorKind, FilterError, IntakeError};

/// Span covering one archive intake; attach with `tracing::Instrument`.
pub fn intake_span(intake_id: &str, archive: &str) -> tracing::Span {
    tracing::info_span!("repodrop.intake", intake_id = %intake_id, archive = %archive)
}

/// Emit event: intake started for an archive.
pub fn emit_intake_started(archive: &str, members: usize) {
    info!(event = "intake.started", archive = %archive, members = members);
}

/// Emit event: archive extracted into the sandbox directory.
pub fn emit_extracted(files: usize, directories: usize, bytes: u64) {
    info!(
        event = "intake.extracted",
        files = files,
        directories = directories,
        bytes = bytes,
    );
}

/// Emit event: repository root selected.
pub fn emit_repository_located(relative_path: &str, depth: usize) {
    info!(event = "intake.repository_located", path = %relative_path, depth = depth);
}

/// Emit event: submodule update finished with a definitive exit status.
pub fn emit_submodule_finished(success: bool, exit_code: Option<i32>, duration_ms: u64) {
    info!(
        event = "intake.submodule_finished",
        success = success,
        exit_code = ?exit_code,
        duration_ms = duration_ms,
    );
}

/// Emit event: intake failed at some stage.
pub fn emit_intake_failed(err: &IntakeError) {
    match err.kind() {
        ErrorKind::Operational => error!(event = "intake.failed", kind = ?err.kind(), error = %err),
        kind => warn!(event = "intake.rejected", kind = ?kind, error = %err),
    }
}

/// Emit event: the sandbox directory could not be removed.
pub fn emit_cleanup_error(path: &std::path::Path, err: &dyn std::fmt::Display) {
    error!(event = "intake.cleanup_error", path = %path.display(), error = %err);
}

/// Emit event: a search filter was refused or its execution failed.
pub fn emit_filter_failed(err: &FilterError) {
    match err.kind() {
        ErrorKind::Operational => error!(event = "search.failed", error = %err),
        kind => warn!(event = "search.rejected", kind = ?kind, error = %err),
    }
}

/// Emit event: a sanitized filter ran to completion.
pub fn emit_search_completed(results: usize, duration_ms: u64) {
    info!(event = "search.completed", results = results, duration_ms = duration_ms);
}

/// Emit event: one reaper pass finished.
pub fn emit_reaper_sweep(users_deleted: u64, uploads_removed: usize) {
    info!(
        event = "reaper.sweep",
        users_deleted = users_deleted,
        uploads_removed = uploads_removed,
    );
}

/// Emit event: a reaper step failed (never propagated).
pub fn emit_reaper_error(step: &str, err: &dyn std::fmt::Display) {
    error!(event = "reaper.error", step = %step, error = %err);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intake_span_create() {
        let span = intake_span("abc", "repo.zip");
        let _entered = span.enter();
    }
}
