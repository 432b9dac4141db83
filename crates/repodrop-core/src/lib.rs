//! Repodrop Core Library
//!
//! The two hostile-input pipelines behind the Repodrop service: repository
//! archive intake and aggregation filter sanitizing.

pub mod archive;
pub mod config;
pub mod error;
pub mod filter;
pub mod intake;
pub mod obs;
pub mod repo;
pub mod telemetry;

pub use archive::{extract_archive, open_archive, validate_members, ExtractReport};

pub use config::{ArchiveLimits, FilterPolicy, IntakeConfig, SubmoduleConfig};

pub use error::{ArchiveRejection, ErrorKind, FilterError, IntakeError};

pub use filter::{
    build_pipeline, execute_bounded, limit_depth, run_search, sanitize_filter, OperatorDenylist,
};

pub use intake::{ExtractionDir, IntakeSuccess, RepoIntake};

pub use repo::{
    audit_repository, audit_repository_config, locate_repository, ConfigAuditRules,
    RepositoryLocation, SubmoduleError, SubmoduleOutcome, SubmoduleResolver,
};

pub use telemetry::{init_tracing, LogFormat};

pub use repodrop_state::{AggregateSource, UserRecord, UserStore};
