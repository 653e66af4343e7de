//! The publish sequence as an explicit list of typed steps.
//!
//! A [`PublishPlan`] is built once per request and executed front to back
//! by a [`StepExecutor`]. Every step declares what happens when it fails:
//! abort the whole sequence, or try a single fallback step.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use tracing::{info, instrument, warn};

use super::redact::Redactor;
use super::runner::{CommandOutput, GitRunner};
use crate::error::{Result, ServerError};

/// Branch the upload is published to.
pub const PRIMARY_BRANCH: &str = "main";
/// Remote branch tried when pushing to [`PRIMARY_BRANCH`] fails.
pub const FALLBACK_BRANCH: &str = "master";

/// What to do when a step fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnFailure {
    /// Stop the sequence and report the failed command.
    Abort,
    /// Run the given step once instead. Only pushes carry a fallback, so a
    /// failed fallback is reported as a push failure.
    Fallback(Box<GitStep>),
}

/// One git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitStep {
    pub args: Vec<String>,
    pub on_failure: OnFailure,
}

impl GitStep {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            on_failure: OnFailure::Abort,
        }
    }

    pub fn with_fallback(mut self, fallback: GitStep) -> Self {
        self.on_failure = OnFailure::Fallback(Box::new(fallback));
        self
    }

    /// The command line as a user would type it. Not redacted.
    pub fn command_line(&self) -> String {
        format!("git {}", self.args.join(" "))
    }
}

/// The ordered steps that turn a directory of files into a pushed commit.
#[derive(Debug, Clone)]
pub struct PublishPlan {
    steps: Vec<GitStep>,
}

impl PublishPlan {
    /// `git init`, identity, add, commit, remote, rename to main, force-push.
    pub fn new(author_name: &str, author_email: &str, message: &str, remote_url: &str) -> Self {
        let push_main = GitStep::new(["push", "-f", "origin", PRIMARY_BRANCH]);
        // The local branch is always `main`; the fallback publishes it to
        // the remote `master`.
        let push_master = GitStep::new([
            "push".to_string(),
            "-f".to_string(),
            "origin".to_string(),
            format!("{PRIMARY_BRANCH}:{FALLBACK_BRANCH}"),
        ]);

        let steps = vec![
            GitStep::new(["init"]),
            GitStep::new(["config", "user.name", author_name]),
            GitStep::new(["config", "user.email", author_email]),
            GitStep::new(["add", "."]),
            GitStep::new(["commit", "-m", message]),
            GitStep::new(["remote", "add", "origin", remote_url]),
            GitStep::new(["branch", "-M", PRIMARY_BRANCH]),
            push_main.with_fallback(push_master),
        ];

        Self { steps }
    }

    pub fn steps(&self) -> &[GitStep] {
        &self.steps
    }
}

/// Runs a [`PublishPlan`] inside one workspace directory.
pub struct StepExecutor<'a> {
    runner: &'a dyn GitRunner,
    dir: &'a Path,
    timeout: Duration,
    redactor: &'a Redactor,
}

impl<'a> StepExecutor<'a> {
    pub fn new(
        runner: &'a dyn GitRunner,
        dir: &'a Path,
        timeout: Duration,
        redactor: &'a Redactor,
    ) -> Self {
        Self {
            runner,
            dir,
            timeout,
            redactor,
        }
    }

    /// Execute every step in order and return the combined, redacted output.
    #[instrument(skip_all, fields(dir = %self.dir.display()))]
    pub async fn execute(&self, plan: &PublishPlan) -> Result<String> {
        let mut output = String::new();

        for step in plan.steps() {
            let Err(failure) = self.run_step(step, &mut output).await else {
                continue;
            };

            match &step.on_failure {
                OnFailure::Abort => {
                    return Err(ServerError::git_command(self.display(step), failure));
                }
                OnFailure::Fallback(fallback) => {
                    warn!(
                        command = %self.display(step),
                        fallback = %self.display(fallback),
                        "Step failed, trying fallback"
                    );
                    let _ = writeln!(
                        output,
                        "{} failed, falling back to {}: {}",
                        self.display(step),
                        self.display(fallback),
                        failure
                    );
                    if let Err(fallback_failure) = self.run_step(fallback, &mut output).await {
                        return Err(ServerError::push(failure, fallback_failure));
                    }
                    let _ = writeln!(output, "{}: fallback succeeded", self.display(fallback));
                }
            }
        }

        info!("Git operations completed");
        Ok(output)
    }

    /// Run one step, appending its output. `Err` holds a redacted reason.
    async fn run_step(&self, step: &GitStep, output: &mut String) -> std::result::Result<(), String> {
        let command = self.display(step);
        info!(%command, "Executing git step");

        let result = match self.runner.run(self.dir, &step.args, self.timeout).await {
            Ok(result) => result,
            Err(err) => return Err(self.redactor.redact(&err.to_string())),
        };

        if !result.success() {
            return Err(self.failure_reason(&result));
        }

        let stdout = self.redactor.redact(&result.stdout);
        if !stdout.is_empty() {
            let _ = writeln!(output, "{command}: {stdout}");
            info!(%command, stdout = %stdout.trim(), "git output");
        }

        let stderr = self.redactor.redact(&result.stderr);
        if !stderr.is_empty() && !stderr.contains("warning") {
            let _ = writeln!(output, "{command} (stderr): {stderr}");
            warn!(%command, stderr = %stderr.trim(), "git diagnostics");
        }

        Ok(())
    }

    fn failure_reason(&self, result: &CommandOutput) -> String {
        let status = match result.exit_code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        };
        let stderr = self.redactor.redact(result.stderr.trim());
        if stderr.is_empty() {
            status
        } else {
            format!("{status}: {stderr}")
        }
    }

    fn display(&self, step: &GitStep) -> String {
        self.redactor.redact(&step.command_line())
    }
}
