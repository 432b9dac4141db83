//! The staged archive intake pipeline.
//!
//! validate → extract → locate → audit → resolve submodules, all inside a
//! private extraction directory that is removed on every exit path.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, Instrument};
use uuid::Uuid;

use crate::archive::extract::{member_names, ExtractReport};
use crate::archive::{extract_archive, open_archive, validate_members};
use crate::config::IntakeConfig;
use crate::error::IntakeError;
use crate::obs;
use crate::repo::{
    audit_repository, locate_repository, RepositoryLocation, SubmoduleError,
    SubmoduleOutcome, SubmoduleResolver,
};

const MAX_STEM_CHARS: usize = 64;

/// Result of a successful intake.
#[derive(Debug, Clone)]
pub struct IntakeSuccess {
    /// Caller-facing message, including the tool's captured output.
    pub message: String,
    /// Repository directory relative to the extraction root.
    pub repository: PathBuf,
    pub report: ExtractReport,
    /// Where the archive was unpacked. Already removed when this is returned.
    pub extraction_dir: PathBuf,
}

/// Request-private extraction directory, removed when dropped.
///
/// Named `extracted_<archive stem>_<random>` inside the caller's work dir.
#[derive(Debug)]
pub struct ExtractionDir {
    dir: TempDir,
}

impl ExtractionDir {
    pub fn create(work_dir: &Path, archive_path: &Path) -> Result<Self, IntakeError> {
        let prefix = format!("extracted_{}_", sanitized_stem(archive_path));
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(work_dir)
            .map_err(|e| IntakeError::io("creating extraction directory", e))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory now, logging rather than returning any failure.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(path = %path.display(), "extraction directory removed"),
            Err(e) => obs::emit_cleanup_error(&path, &e),
        }
    }
}

/// Archive file stem reduced to `[A-Za-z0-9_-]`, never empty.
fn sanitized_stem(archive_path: &Path) -> String {
    let stem: String = archive_path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .take(MAX_STEM_CHARS)
        .collect();
    if stem.is_empty() {
        "archive".to_string()
    } else {
        stem
    }
}

/// Runs uploaded archives through every intake stage.
#[derive(Debug, Clone, Default)]
pub struct RepoIntake {
    config: IntakeConfig,
    resolver: SubmoduleResolver,
}

impl RepoIntake {
    pub fn new(config: IntakeConfig) -> Self {
        let resolver = SubmoduleResolver::new(config.submodule.clone());
        Self { config, resolver }
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    /// Process the archive at `archive_path`, unpacking it inside `work_dir`.
    ///
    /// Any stage failure ends the run. The extraction directory is gone by
    /// the time this returns, whatever the outcome.
    pub async fn process(
        &self,
        archive_path: &Path,
        work_dir: &Path,
    ) -> Result<IntakeSuccess, IntakeError> {
        let intake_id = Uuid::new_v4().simple().to_string();
        let archive_label = archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let span = obs::intake_span(&intake_id, &archive_label);

        async {
            let result = self.run(archive_path, work_dir).await;
            if let Err(e) = &result {
                obs::emit_intake_failed(e);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, archive_path: &Path, work_dir: &Path) -> Result<IntakeSuccess, IntakeError> {
        let extraction = ExtractionDir::create(work_dir, archive_path)?;
        let extraction_dir = extraction.path().to_path_buf();

        let outcome = self.run_stages(archive_path, &extraction_dir).await;
        extraction.close();

        let (message, location, report) = outcome?;
        Ok(IntakeSuccess {
            message,
            repository: location.relative,
            report,
            extraction_dir,
        })
    }

    async fn run_stages(
        &self,
        archive_path: &Path,
        root: &Path,
    ) -> Result<(String, RepositoryLocation, ExtractReport), IntakeError> {
        let (report, location) = self.unpack_and_inspect(archive_path, root).await?;

        match self.resolver.resolve(&location.path).await {
            SubmoduleOutcome::Success { message, .. } => Ok((message, location, report)),
            SubmoduleOutcome::Failure { message, .. } => {
                Err(IntakeError::SubmoduleFailed { message })
            }
            SubmoduleOutcome::Error(SubmoduleError::TimedOut { limit_secs }) => {
                Err(IntakeError::Timeout { limit_secs })
            }
            SubmoduleOutcome::Error(SubmoduleError::ToolNotInstalled { program }) => {
                Err(IntakeError::ToolMissing { program })
            }
            SubmoduleOutcome::Error(other) => Err(IntakeError::Internal(other.to_string())),
        }
    }

    /// Validation, extraction, location and audit, on the blocking pool.
    async fn unpack_and_inspect(
        &self,
        archive_path: &Path,
        root: &Path,
    ) -> Result<(ExtractReport, RepositoryLocation), IntakeError> {
        let archive_path = archive_path.to_path_buf();
        let root = root.to_path_buf();
        let limits = self.config.limits.clone();
        let audit = self.config.audit.clone();
        let span = tracing::Span::current();

        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();

            let mut archive = open_archive(&archive_path)?;
            let names = member_names(&archive);
            obs::emit_intake_started(&archive_path.display().to_string(), names.len());
            validate_members(&names, &limits)?;

            let report = extract_archive(&mut archive, &root, &limits)?;
            obs::emit_extracted(report.files, report.directories, report.bytes);

            let location = locate_repository(&root).ok_or(IntakeError::NoRepository)?;
            obs::emit_repository_located(&location.relative.display().to_string(), location.depth);

            audit_repository(&location.git_dir(), &audit)?;
            Ok((report, location))
        })
        .await
        .map_err(|e| IntakeError::Internal(format!("intake task failed: {e}")))?
    }
}
