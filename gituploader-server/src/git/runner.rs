//! Running the `git` executable.
//!
//! [`GitRunner`] is the seam between the step executor and the process
//! boundary. [`SystemGit`] spawns the real binary through
//! [`tokio::process::Command`]; tests substitute a scripted runner.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one finished git invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A zero-exit result with the given stdout.
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed result with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Reasons a git invocation produced no [`CommandOutput`] at all.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to spawn git: {0}")]
    Spawn(#[from] io::Error),

    #[error("timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
}

/// Executes a single git command in a working directory.
pub trait GitRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        dir: &'a Path,
        args: &'a [String],
        timeout: Duration,
    ) -> BoxFuture<'a, Result<CommandOutput, RunError>>;
}

/// Runs the git binary installed on the host.
#[derive(Debug, Clone)]
pub struct SystemGit {
    bin: PathBuf,
}

impl SystemGit {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitRunner for SystemGit {
    fn run<'a>(
        &'a self,
        dir: &'a Path,
        args: &'a [String],
        timeout: Duration,
    ) -> BoxFuture<'a, Result<CommandOutput, RunError>> {
        Box::pin(async move {
            let mut cmd = Command::new(&self.bin);
            cmd.args(args).current_dir(dir);

            // Fail on bad credentials instead of waiting for a prompt.
            cmd.env("GIT_TERMINAL_PROMPT", "0");

            cmd.stdin(Stdio::null());
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
            cmd.kill_on_drop(true);

            let output = match tokio::time::timeout(timeout, cmd.output()).await {
                Ok(result) => result?,
                Err(_) => return Err(RunError::Timeout(timeout)),
            };

            debug!(status = %output.status, "git exited");

            Ok(CommandOutput {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}
