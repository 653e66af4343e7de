//! Git publishing.
//!
//! Everything that touches the `git` executable lives here: the runner
//! seam, the ordered publish plan, and credential redaction for anything
//! that is logged or returned to a client.

pub mod redact;
pub mod runner;
pub mod steps;

pub use redact::Redactor;
pub use runner::{CommandOutput, GitRunner, RunError, SystemGit};
pub use steps::{GitStep, OnFailure, PublishPlan, StepExecutor};
