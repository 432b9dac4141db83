//! Error taxonomy for the archive intake and filter pipelines.
//!
//! Every error maps onto one [`ErrorKind`]. The HTTP edge picks a status from
//! the kind and shows callers only [`IntakeError::client_message`] /
//! [`FilterError::client_message`]; full detail goes to the log.

use std::path::PathBuf;

/// Coarse classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or policy-violating input.
    Validation,
    /// Input that looks adversarial (traversal, symlinks, dangerous config, denied operators).
    SecurityPolicy,
    /// An external tool or the database exceeded its time budget.
    Timeout,
    /// Host-side faults: missing tools, I/O, task failures.
    Operational,
}

/// Reasons an archive is refused before or during extraction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArchiveRejection {
    #[error("path traversal attempt in member '{member}'")]
    PathTraversal { member: String },

    #[error("too many files: {count} members (limit {limit})")]
    TooManyFiles { count: usize, limit: usize },

    #[error("excessive nesting in member '{member}': depth {depth} (limit {limit})")]
    ExcessiveNesting {
        member: String,
        depth: usize,
        limit: usize,
    },

    #[error("path escape attempt in member '{member}'")]
    PathEscape { member: String },

    #[error("symlink creation attempt in member '{member}'")]
    SymlinkCreation { member: String },

    #[error("archive expands beyond size limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("invalid or corrupted archive")]
    Corrupted,
}

impl ArchiveRejection {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArchiveRejection::PathTraversal { .. }
            | ArchiveRejection::PathEscape { .. }
            | ArchiveRejection::SymlinkCreation { .. } => ErrorKind::SecurityPolicy,
            ArchiveRejection::TooManyFiles { .. }
            | ArchiveRejection::ExcessiveNesting { .. }
            | ArchiveRejection::TooLarge { .. }
            | ArchiveRejection::Corrupted => ErrorKind::Validation,
        }
    }

    fn client_message(&self) -> &'static str {
        match self {
            ArchiveRejection::PathTraversal { .. } => {
                "Malicious ZIP file detected - path traversal attempt"
            }
            ArchiveRejection::TooManyFiles { .. } => "ZIP file contains too many files",
            ArchiveRejection::ExcessiveNesting { .. } => {
                "ZIP file has excessive directory nesting"
            }
            ArchiveRejection::PathEscape { .. } => {
                "Malicious ZIP file detected - path escape attempt"
            }
            ArchiveRejection::SymlinkCreation { .. } => {
                "Malicious ZIP file detected - symlink creation attempt"
            }
            ArchiveRejection::TooLarge { .. } => "ZIP file expands beyond the size limit",
            ArchiveRejection::Corrupted => "Invalid or corrupted ZIP file",
        }
    }
}

/// Failures of the archive intake pipeline.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("archive rejected: {0}")]
    Archive(#[from] ArchiveRejection),

    #[error("no repository found")]
    NoRepository,

    #[error("dangerous repository configuration: {rule}")]
    DangerousConfig { rule: String },

    #[error("submodule update exited unsuccessfully: {message}")]
    SubmoduleFailed { message: String },

    #[error("submodule update timed out after {limit_secs}s")]
    Timeout { limit_secs: u64 },

    #[error("version-control tool not installed: {program}")]
    ToolMissing { program: PathBuf },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntakeError {
    /// Wrap an I/O error with a short description of what was being attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        IntakeError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            IntakeError::Archive(rejection) => rejection.kind(),
            IntakeError::NoRepository | IntakeError::SubmoduleFailed { .. } => {
                ErrorKind::Validation
            }
            IntakeError::DangerousConfig { .. } => ErrorKind::SecurityPolicy,
            IntakeError::Timeout { .. } => ErrorKind::Timeout,
            IntakeError::ToolMissing { .. } | IntakeError::Io { .. } | IntakeError::Internal(_) => {
                ErrorKind::Operational
            }
        }
    }

    /// Caller-facing text. Never contains host paths or internal detail.
    pub fn client_message(&self) -> String {
        match self {
            IntakeError::Archive(rejection) => rejection.client_message().to_string(),
            IntakeError::NoRepository => "No Git repository found. ZIP must contain .git directory in root or main folder.".to_string(),
            IntakeError::DangerousConfig { rule } => {
                format!("Malicious Git repository detected - {rule} found in .git/config")
            }
            IntakeError::SubmoduleFailed { message } => message.clone(),
            IntakeError::Timeout { limit_secs } => {
                format!("Git command timed out (>{limit_secs} seconds)")
            }
            IntakeError::ToolMissing { .. } | IntakeError::Io { .. } | IntakeError::Internal(_) => {
                "Processing failed".to_string()
            }
        }
    }
}

/// Failures of the filter sanitizer and the bounded executor.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("filter is not a JSON object")]
    NotAnObject,

    #[error("filter is empty")]
    Empty,

    #[error("filter has {count} top-level keys (limit {limit})")]
    TooManyKeys { count: usize, limit: usize },

    #[error("filter uses denied operator {operator}")]
    DeniedOperator { operator: String },

    #[error("filter is too deep or empty after depth limiting")]
    TooDeep,

    #[error("aggregation exceeded {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    #[error("aggregation backend failed: {0}")]
    Backend(String),
}

impl FilterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FilterError::NotAnObject
            | FilterError::Empty
            | FilterError::TooManyKeys { .. }
            | FilterError::TooDeep => ErrorKind::Validation,
            FilterError::DeniedOperator { .. } => ErrorKind::SecurityPolicy,
            FilterError::Timeout { .. } => ErrorKind::Timeout,
            FilterError::Backend(_) => ErrorKind::Operational,
        }
    }

    pub fn client_message(&self) -> &'static str {
        match self {
            FilterError::NotAnObject => "Invalid filter",
            FilterError::Empty => "Missing filter",
            FilterError::TooManyKeys { .. } => "Too many filter options",
            FilterError::DeniedOperator { .. } => "Invalid Filter found",
            FilterError::TooDeep => "Filter too deep or invalid",
            FilterError::Timeout { .. } => "Query timeout - operation too slow",
            FilterError::Backend(_) => "Something went wrong",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_rejection_kinds() {
        let traversal = ArchiveRejection::PathTraversal {
            member: "../x".into(),
        };
        assert_eq!(traversal.kind(), ErrorKind::SecurityPolicy);

        let count = ArchiveRejection::TooManyFiles {
            count: 151,
            limit: 150,
        };
        assert_eq!(count.kind(), ErrorKind::Validation);
        assert!(count.to_string().contains("151"));
    }

    #[test]
    fn test_operational_errors_hide_detail() {
        let err = IntakeError::io(
            "writing member 'a.txt'",
            std::io::Error::new(std::io::ErrorKind::Other, "/srv/uploads/secret disk full"),
        );
        assert_eq!(err.kind(), ErrorKind::Operational);
        assert_eq!(err.client_message(), "Processing failed");
        assert!(err.to_string().contains("disk full"));

        let missing = IntakeError::ToolMissing {
            program: PathBuf::from("git"),
        };
        assert_eq!(missing.client_message(), "Processing failed");
    }

    #[test]
    fn test_timeout_is_distinct() {
        let err = IntakeError::Timeout { limit_secs: 10 };
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.client_message().contains("timed out"));
    }

    #[test]
    fn test_dangerous_config_message_names_rule() {
        let err = IntakeError::DangerousConfig {
            rule: "fsmonitor".into(),
        };
        assert_eq!(err.kind(), ErrorKind::SecurityPolicy);
        assert!(err.client_message().contains("fsmonitor"));
    }

    #[test]
    fn test_filter_error_messages() {
        assert_eq!(
            FilterError::DeniedOperator {
                operator: "$where".into()
            }
            .client_message(),
            "Invalid Filter found"
        );
        assert_eq!(FilterError::TooDeep.client_message(), "Filter too deep or invalid");
        assert_eq!(
            FilterError::Timeout { limit_ms: 4000 }.kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            FilterError::Backend("conn reset".into()).client_message(),
            "Something went wrong"
        );
    }
}
