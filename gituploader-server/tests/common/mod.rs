//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Error;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures::future::BoxFuture;
use serde_json::Value;
use tower::ServiceExt;

use gituploader_server::config::ServerConfig;
use gituploader_server::git::{CommandOutput, GitRunner, RunError};
use gituploader_server::http::{create_router, AppState};
use gituploader_server::upload::Publisher;

/// A git invocation seen by [`FakeGit`].
#[derive(Clone, Debug)]
pub struct Call {
    pub dir: PathBuf,
    pub args: Vec<String>,
    /// Files present in the working directory when the call was made.
    pub files: Vec<PathBuf>,
}

impl Call {
    pub fn command_line(&self) -> String {
        format!("git {}", self.args.join(" "))
    }
}

/// A scripted git runner. Every command succeeds and echoes its arguments
/// on stdout, unless it was registered with [`FakeGit::failing`] or
/// [`FakeGit::timing_out`].
#[derive(Default)]
pub struct FakeGit {
    failures: Vec<(Vec<String>, String)>,
    timeouts: Vec<Vec<String>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, args: &[&str], stderr: &str) -> Self {
        self.failures.push((
            args.iter().map(|s| s.to_string()).collect(),
            stderr.to_string(),
        ));
        self
    }

    pub fn timing_out(mut self, args: &[&str]) -> Self {
        self.timeouts
            .push(args.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(Call::command_line).collect()
    }
}

impl GitRunner for FakeGit {
    fn run<'a>(
        &'a self,
        dir: &'a Path,
        args: &'a [String],
        timeout: Duration,
    ) -> BoxFuture<'a, Result<CommandOutput, RunError>> {
        self.calls.lock().unwrap().push(Call {
            dir: dir.to_path_buf(),
            args: args.to_vec(),
            files: list_files(dir),
        });

        if self.timeouts.iter().any(|t| t == args) {
            return Box::pin(futures::future::ready(Err(RunError::Timeout(timeout))));
        }

        let output = match self.failures.iter().find(|(failing, _)| failing == args) {
            Some((_, stderr)) => CommandOutput::failed(1, stderr.clone()),
            None => CommandOutput::succeeded(format!("ok: git {}", args.join(" "))),
        };
        Box::pin(futures::future::ready(Ok(output)))
    }
}

/// Relative paths of every file under `root`, sorted.
pub fn list_files(root: &Path) -> Vec<PathBuf> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, out);
            } else if let Ok(rel) = path.strip_prefix(root) {
                out.push(rel.to_path_buf());
            }
        }
    }

    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}

/// Number of entries directly under `root`.
pub fn entry_count(root: &Path) -> usize {
    std::fs::read_dir(root).map(|e| e.count()).unwrap_or(0)
}

/// A router whose workspaces live under `temp_root` and whose git is `git`.
pub fn app(temp_root: &Path, git: Arc<FakeGit>) -> Router {
    app_with(
        ServerConfig {
            temp_root: temp_root.to_path_buf(),
            ..ServerConfig::default()
        },
        git,
    )
}

pub fn app_with(config: ServerConfig, git: Arc<FakeGit>) -> Router {
    let config = Arc::new(config);
    let publisher = Arc::new(Publisher::new(config.clone(), git));
    create_router(AppState::new(config, publisher))
}

/// Send a raw body to `POST /api/upload`.
pub async fn post_raw(
    app: Router,
    body: impl Into<Body>,
    headers: &[(&str, &str)],
) -> Result<(StatusCode, Value), Error> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(header::CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let response = app.oneshot(builder.body(body.into())?).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

pub async fn post_upload(app: Router, body: Value) -> Result<(StatusCode, Value), Error> {
    post_raw(app, body.to_string(), &[]).await
}

pub async fn get_json(app: Router, uri: &str) -> Result<(StatusCode, Value), Error> {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

/// Whether a usable `git` binary is on the PATH.
pub fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}
