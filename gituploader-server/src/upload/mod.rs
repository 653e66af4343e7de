//! The upload-and-publish handler.
//!
//! [`Publisher::publish`] validates an [`UploadRequest`], writes its files
//! into a fresh [`Workspace`], commits them, and force-pushes the result.
//! The workspace is removed on every exit path.

pub mod target;
pub mod workspace;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::git::{GitRunner, PublishPlan, Redactor, StepExecutor, SystemGit};

pub use target::RepoTarget;
pub use workspace::{PendingFile, Workspace};

/// One uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub is_text: bool,
}

/// Body of `POST /api/upload`.
///
/// Every field is optional at the wire level so that missing fields are
/// reported as a validation failure rather than a deserialization error.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub files: Option<Vec<FileEntry>>,
    pub repo_url: Option<String>,
    pub token: Option<String>,
    pub commit_message: Option<String>,
}

/// Successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub files_uploaded: usize,
    pub output: String,
    pub message: String,
}

/// A request that passed validation.
pub struct ValidatedUpload {
    pub files: Vec<PendingFile>,
    pub target: RepoTarget,
    pub token: String,
    pub commit_message: String,
}

impl UploadRequest {
    /// Check the request without touching the filesystem.
    pub fn validate(self, config: &ServerConfig) -> Result<ValidatedUpload> {
        let missing = || ServerError::validation("Missing required fields: files, repoUrl, or token");

        let files = self.files.filter(|f| !f.is_empty()).ok_or_else(missing)?;
        let repo_url = self.repo_url.filter(|u| !u.trim().is_empty()).ok_or_else(missing)?;
        let token = self.token.filter(|t| !t.is_empty()).ok_or_else(missing)?;

        let target = RepoTarget::parse(&repo_url, &config.repo_host)?;

        let files = files
            .into_iter()
            .map(|entry| -> Result<PendingFile> {
                Ok(PendingFile {
                    path: workspace::relative_path(&entry.path)?,
                    content: entry.content,
                    is_text: entry.is_text,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let commit_message = self
            .commit_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| config.default_commit_message.clone());

        Ok(ValidatedUpload {
            files,
            target,
            token,
            commit_message,
        })
    }
}

/// Publishes uploads to their target repositories.
pub struct Publisher {
    config: Arc<ServerConfig>,
    runner: Arc<dyn GitRunner>,
}

impl Publisher {
    pub fn new(config: Arc<ServerConfig>, runner: Arc<dyn GitRunner>) -> Self {
        Self { config, runner }
    }

    /// A publisher that runs the configured git binary.
    pub fn with_system_git(config: Arc<ServerConfig>) -> Self {
        let runner = Arc::new(SystemGit::new(config.git_bin.clone()));
        Self::new(config, runner)
    }

    /// Validate, materialize, commit and push one upload.
    pub async fn publish(&self, request: UploadRequest) -> Result<UploadResponse> {
        let upload = request.validate(&self.config)?;

        info!(
            repo = %upload.target.full_name(),
            files = upload.files.len(),
            "Processing upload"
        );

        let workspace = Workspace::create(&self.config.temp_root)?;
        let result = self.publish_in(&workspace, &upload).await;

        if let Err(err) = workspace.close().await {
            warn!(error = %err, "Workspace cleanup failed");
        }

        result
    }

    async fn publish_in(&self, workspace: &Workspace, upload: &ValidatedUpload) -> Result<UploadResponse> {
        for file in &upload.files {
            workspace.write_file(file).await?;
        }
        debug!(count = upload.files.len(), "Files materialized");

        // `git init` keeps an existing `.git`, including its config.
        if tokio::fs::try_exists(workspace.path().join(".git")).await? {
            return Err(ServerError::internal("Workspace already contains a .git directory"));
        }

        let remote = upload.target.authenticated_url(&upload.token)?;
        let redactor = Redactor::for_token(&upload.token);
        let plan = PublishPlan::new(
            &self.config.commit_name,
            &self.config.commit_email,
            &upload.commit_message,
            &remote,
        );

        let output = StepExecutor::new(
            self.runner.as_ref(),
            workspace.path(),
            self.config.command_timeout,
            &redactor,
        )
        .execute(&plan)
        .await?;

        let count = upload.files.len();
        Ok(UploadResponse {
            success: true,
            files_uploaded: count,
            output,
            message: format!(
                "Successfully uploaded {count} files to {}",
                upload.target.full_name()
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(files: Option<Vec<FileEntry>>, repo_url: Option<&str>, token: Option<&str>) -> UploadRequest {
        UploadRequest {
            files,
            repo_url: repo_url.map(String::from),
            token: token.map(String::from),
            commit_message: None,
        }
    }

    fn one_file() -> Option<Vec<FileEntry>> {
        Some(vec![FileEntry {
            path: "a.txt".to_string(),
            content: "hello".to_string(),
            is_text: true,
        }])
    }

    const URL: &str = "https://github.com/octocat/hello-world.git";

    #[test]
    fn test_validate_requires_fields() {
        let config = ServerConfig::default();
        for req in [
            request(None, Some(URL), Some("t")),
            request(Some(vec![]), Some(URL), Some("t")),
            request(one_file(), None, Some("t")),
            request(one_file(), Some("  "), Some("t")),
            request(one_file(), Some(URL), None),
            request(one_file(), Some(URL), Some("")),
        ] {
            let err = req.validate(&config).err().unwrap();
            assert_eq!(err.to_string(), "Missing required fields: files, repoUrl, or token");
        }
    }

    #[test]
    fn test_validate_defaults_commit_message() {
        let config = ServerConfig::default();
        let upload = request(one_file(), Some(URL), Some("t")).validate(&config).unwrap();
        assert_eq!(upload.commit_message, "Upload via GitUploader");
        assert_eq!(upload.target.full_name(), "octocat/hello-world");
        assert_eq!(upload.files[0].path, std::path::PathBuf::from("a.txt"));
    }

    #[test]
    fn test_validate_rejects_escaping_path() {
        let config = ServerConfig::default();
        let files = Some(vec![FileEntry {
            path: "../outside".to_string(),
            content: String::new(),
            is_text: true,
        }]);
        let err = request(files, Some(URL), Some("t"))
            .validate(&config)
            .err()
            .unwrap();
        assert!(matches!(err, ServerError::Validation(_)));
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let req: UploadRequest = serde_json::from_str(
            r#"{"files":[{"path":"a","content":"b"}],"repoUrl":"u","token":"t","commitMessage":"m"}"#,
        )
        .unwrap();
        let files = req.files.unwrap();
        assert!(!files[0].is_text);
        assert_eq!(req.repo_url.as_deref(), Some("u"));
        assert_eq!(req.commit_message.as_deref(), Some("m"));
    }
}
