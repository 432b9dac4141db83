//! Pre-execution audit of a repository's `.git/config`.
//!
//! Several configuration keys make the version-control tool run arbitrary
//! programs. The audit refuses any repository whose config names one of them
//! before the tool is ever invoked. Configs of absorbed submodules under
//! `.git/modules` are read by the tool too, so they get the same rules.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::IntakeError;

/// Rule name reported for `submodule.<name>.update = !<command>`.
pub const COMMAND_UPDATE_RULE: &str = "submodule update command";
/// Rule name reported for `[include]` and `[includeIf ...]` sections.
pub const INCLUDE_RULE: &str = "include directive";

static COMMAND_UPDATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*update\s*=\s*!").expect("command update pattern"));

static INCLUDE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*\[\s*include(if)?\b").expect("include pattern"));

/// Which settings make a repository configuration unacceptable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigAuditRules {
    /// Lower-case substrings rejected anywhere in the file.
    pub forbidden_substrings: Vec<String>,
    /// Reject `update = !cmd` lines.
    pub reject_command_updates: bool,
    /// Reject `[include]` and `[includeIf]` sections.
    pub reject_includes: bool,
}

impl ConfigAuditRules {
    /// Only the filesystem-monitor check.
    pub fn fsmonitor_only() -> Self {
        Self {
            forbidden_substrings: vec!["fsmonitor".to_string()],
            reject_command_updates: false,
            reject_includes: false,
        }
    }

    /// Every known command-executing setting.
    pub fn standard() -> Self {
        Self {
            forbidden_substrings: ["fsmonitor", "sshcommand", "gitproxy", "hookspath"]
                .into_iter()
                .map(String::from)
                .collect(),
            reject_command_updates: true,
            reject_includes: true,
        }
    }

    /// Name of the first rule `content` violates, if any. Matching ignores case.
    pub fn find_violation(&self, content: &str) -> Option<String> {
        let lowered = content.to_lowercase();

        if let Some(hit) = self
            .forbidden_substrings
            .iter()
            .find(|needle| lowered.contains(needle.to_lowercase().as_str()))
        {
            return Some(hit.clone());
        }
        if self.reject_command_updates && COMMAND_UPDATE_PATTERN.is_match(&lowered) {
            return Some(COMMAND_UPDATE_RULE.to_string());
        }
        if self.reject_includes && INCLUDE_PATTERN.is_match(&lowered) {
            return Some(INCLUDE_RULE.to_string());
        }
        None
    }
}

impl Default for ConfigAuditRules {
    fn default() -> Self {
        Self::standard()
    }
}

/// Audit the config file at `config_path`. A missing file passes.
pub fn audit_repository_config(
    config_path: &Path,
    rules: &ConfigAuditRules,
) -> Result<(), IntakeError> {
    let bytes = match std::fs::read(config_path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(IntakeError::io("reading repository config", e)),
    };

    match rules.find_violation(&String::from_utf8_lossy(&bytes)) {
        Some(rule) => Err(IntakeError::DangerousConfig { rule }),
        None => Ok(()),
    }
}

/// Audit `<git_dir>/config` and every `config` file under
/// `<git_dir>/modules`. Links are not followed; missing files pass.
pub fn audit_repository(git_dir: &Path, rules: &ConfigAuditRules) -> Result<(), IntakeError> {
    audit_repository_config(&git_dir.join("config"), rules)?;

    let modules = git_dir.join("modules");
    if !modules.is_dir() {
        return Ok(());
    }
    for entry in WalkDir::new(&modules).follow_links(false).sort_by_file_name() {
        let entry =
            entry.map_err(|e| IntakeError::io("scanning submodule configs", e.into()))?;
        if entry.file_type().is_file() && entry.file_name() == "config" {
            audit_repository_config(entry.path(), rules)?;
        }
    }
    Ok(())
}
