//! Repository discovery, configuration audit and submodule resolution.

pub mod audit;
pub mod locate;
pub mod submodule;

pub use audit::{audit_repository, audit_repository_config, ConfigAuditRules};
pub use locate::{locate_repository, RepositoryLocation};
pub use submodule::{SubmoduleError, SubmoduleOutcome, SubmoduleResolver};
