//! Submodule initialization through the external version-control tool.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::SubmoduleConfig;
use crate::obs;

/// Fixed argument list; nothing caller-supplied is ever appended.
pub const SUBMODULE_ARGS: [&str; 4] = ["submodule", "update", "--init", "--recursive"];

const SUCCESS_MESSAGE: &str = "Git submodules updated successfully!";
const FAILURE_MESSAGE: &str = "Git submodule update failed";

/// Why the tool could not produce a definitive exit status.
#[derive(Debug, thiserror::Error)]
pub enum SubmoduleError {
    #[error("timed out after {limit_secs}s")]
    TimedOut { limit_secs: u64 },

    #[error("tool not installed: {}", program.display())]
    ToolNotInstalled { program: PathBuf },

    #[error("repository directory missing: {}", path.display())]
    MissingDirectory { path: PathBuf },

    #[error("failed to run tool: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of one submodule update.
#[derive(Debug)]
pub enum SubmoduleOutcome {
    /// The tool exited with status zero.
    Success { message: String, stdout: String },
    /// The tool exited with a non-zero status.
    Failure {
        message: String,
        stderr: String,
        exit_code: Option<i32>,
    },
    /// No definitive exit status was obtained.
    Error(SubmoduleError),
}

impl SubmoduleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmoduleOutcome::Success { .. })
    }

    fn success(stdout: &str) -> Self {
        let stdout = stdout.trim().to_string();
        let message = if stdout.is_empty() {
            SUCCESS_MESSAGE.to_string()
        } else {
            format!("{SUCCESS_MESSAGE}\nOutput: {stdout}")
        };
        SubmoduleOutcome::Success { message, stdout }
    }

    fn failure(stderr: &str, exit_code: Option<i32>) -> Self {
        let stderr = stderr.trim().to_string();
        let message = if stderr.is_empty() {
            FAILURE_MESSAGE.to_string()
        } else {
            format!("{FAILURE_MESSAGE}: {stderr}")
        };
        SubmoduleOutcome::Failure {
            message,
            stderr,
            exit_code,
        }
    }
}

/// Runs `submodule update --init --recursive` inside a repository.
#[derive(Debug, Clone, Default)]
pub struct SubmoduleResolver {
    config: SubmoduleConfig,
}

impl SubmoduleResolver {
    pub fn new(config: SubmoduleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SubmoduleConfig {
        &self.config
    }

    /// Run the update with `repo` as working directory under the configured timeout.
    ///
    /// The tool runs in its own process group. On timeout the whole group is
    /// killed and the child reaped before returning, so nothing it spawned
    /// outlives the call. A spawn failure with `NotFound` is reported as
    /// [`SubmoduleError::ToolNotInstalled`].
    pub async fn resolve(&self, repo: &Path) -> SubmoduleOutcome {
        if !repo.is_dir() {
            return SubmoduleOutcome::Error(SubmoduleError::MissingDirectory {
                path: repo.to_path_buf(),
            });
        }

        let start = Instant::now();
        debug!(program = %self.config.program.display(), repo = %repo.display(), "running submodule update");

        let mut command = Command::new(&self.config.program);
        command
            .args(SUBMODULE_ARGS)
            .current_dir(repo)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return SubmoduleOutcome::Error(SubmoduleError::ToolNotInstalled {
                    program: self.config.program.clone(),
                });
            }
            Err(e) => return SubmoduleOutcome::Error(SubmoduleError::Io(e)),
        };

        let group = child.id();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let waited = tokio::time::timeout(self.config.timeout(), async {
            let (status, stdout, stderr) =
                tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr));
            Ok::<_, std::io::Error>((status?, stdout?, stderr?))
        })
        .await;

        let (status, stdout, stderr) = match waited {
            Ok(Ok(collected)) => collected,
            Ok(Err(e)) => {
                terminate_group(group);
                let _ = child.kill().await;
                return SubmoduleOutcome::Error(SubmoduleError::Io(e));
            }
            Err(_) => {
                terminate_group(group);
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to reap timed-out submodule update");
                }
                return SubmoduleOutcome::Error(SubmoduleError::TimedOut {
                    limit_secs: self.config.timeout_secs,
                });
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = status.code();
        obs::emit_submodule_finished(status.success(), exit_code, duration_ms);

        if status.success() {
            SubmoduleOutcome::success(&String::from_utf8_lossy(&stdout))
        } else {
            SubmoduleOutcome::failure(&String::from_utf8_lossy(&stderr), exit_code)
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// SIGKILL every process in the group led by `leader`.
#[cfg(unix)]
fn terminate_group(leader: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = leader.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pgid = pid, error = %e, "failed to kill submodule process group"),
    }
}

#[cfg(not(unix))]
fn terminate_group(_leader: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_message_appends_output() {
        let outcome = SubmoduleOutcome::success("Cloning into 'lib'...\n");
        match outcome {
            SubmoduleOutcome::Success { message, .. } => {
                assert_eq!(
                    message,
                    "Git submodules updated successfully!\nOutput: Cloning into 'lib'..."
                );
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_success_message_without_output() {
        let outcome = SubmoduleOutcome::success("");
        assert!(
            matches!(outcome, SubmoduleOutcome::Success { message, .. } if message == SUCCESS_MESSAGE)
        );
    }

    #[test]
    fn test_failure_message_appends_stderr() {
        let outcome = SubmoduleOutcome::failure("fatal: no url\n", Some(128));
        assert!(matches!(
            outcome,
            SubmoduleOutcome::Failure { message, exit_code: Some(128), .. }
                if message == "Git submodule update failed: fatal: no url"
        ));
    }

    #[test]
    fn test_whitespace_only_output_is_ignored() {
        let outcome = SubmoduleOutcome::success(" \n\n");
        assert!(
            matches!(outcome, SubmoduleOutcome::Success { message, stdout } if message == SUCCESS_MESSAGE && stdout.is_empty())
        );
        let outcome = SubmoduleOutcome::failure("\n", Some(1));
        assert!(matches!(
            outcome,
            SubmoduleOutcome::Failure { message, .. } if message == FAILURE_MESSAGE
        ));
    }

    #[tokio::test]
    async fn test_missing_tool_is_distinct() {
        let tmp = tempfile::tempdir().unwrap();
        let resolver = SubmoduleResolver::new(SubmoduleConfig {
            program: PathBuf::from("/nonexistent/repodrop-no-such-tool"),
            timeout_secs: 10,
        });
        let outcome = resolver.resolve(tmp.path()).await;
        assert!(matches!(
            outcome,
            SubmoduleOutcome::Error(SubmoduleError::ToolNotInstalled { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_reported_as_missing_tool() {
        let tmp = tempfile::tempdir().unwrap();
        let outcome = SubmoduleResolver::default()
            .resolve(&tmp.path().join("gone"))
            .await;
        assert!(matches!(
            outcome,
            SubmoduleOutcome::Error(SubmoduleError::MissingDirectory { .. })
        ));
    }
}
