//! Tunables for both pipelines.
//!
//! Defaults carry the service's production limits; tests and operators may
//! override individual fields.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::filter::denylist::OperatorDenylist;
use crate::repo::audit::ConfigAuditRules;

/// Bounds applied to an archive before and during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveLimits {
    /// Maximum number of members (files and directories).
    pub max_members: usize,
    /// Maximum separators in a single member path.
    pub max_depth: usize,
    /// Maximum bytes written across all members.
    pub max_total_bytes: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_members: 150,
            max_depth: 6,
            max_total_bytes: 32 * 1024 * 1024,
        }
    }
}

/// How the external version-control tool is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmoduleConfig {
    /// Executable to run; resolved through `PATH` when relative.
    pub program: PathBuf,
    /// Wall-clock budget for the whole invocation (seconds).
    pub timeout_secs: u64,
}

impl SubmoduleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SubmoduleConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
            timeout_secs: 10,
        }
    }
}

/// Configuration for the archive intake pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntakeConfig {
    pub limits: ArchiveLimits,
    pub audit: ConfigAuditRules,
    pub submodule: SubmoduleConfig,
}

/// Configuration for the filter sanitizer and the bounded executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPolicy {
    /// Maximum number of top-level keys.
    pub max_keys: usize,
    /// Maximum nesting depth; the filter object itself is depth 0.
    pub max_depth: usize,
    /// Operator names refused anywhere in the filter.
    pub denylist: OperatorDenylist,
    /// Documents returned at most.
    pub result_cap: u32,
    /// Wall-clock budget for executing the pipeline (milliseconds).
    pub timeout_ms: u64,
}

impl FilterPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            max_keys: 5,
            max_depth: 2,
            denylist: OperatorDenylist::standard(),
            result_cap: 2,
            timeout_ms: 4_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intake_defaults() {
        let cfg = IntakeConfig::default();
        assert_eq!(cfg.limits.max_members, 150);
        assert_eq!(cfg.limits.max_depth, 6);
        assert_eq!(cfg.submodule.program, PathBuf::from("git"));
        assert_eq!(cfg.submodule.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_filter_policy_defaults() {
        let policy = FilterPolicy::default();
        assert_eq!(policy.max_keys, 5);
        assert_eq!(policy.max_depth, 2);
        assert_eq!(policy.result_cap, 2);
        assert_eq!(policy.timeout(), Duration::from_secs(4));
        assert!(policy.denylist.contains("$where"));
    }

    #[test]
    fn test_filter_policy_deserializes_from_json() {
        let json = serde_json::to_string(&FilterPolicy::default()).unwrap();
        let back: FilterPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FilterPolicy::default());
    }
}
