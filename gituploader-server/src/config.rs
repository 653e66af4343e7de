//! Server configuration management.
//!
//! Configuration is loaded from environment variables with sensible defaults.
//! The resulting [`ServerConfig`] is handed to the upload handler when it is
//! constructed; nothing reads the environment after startup.

use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::error::{Result, ServerError};

/// Server configuration loaded from environment variables.
#[derive(Clone)]
pub struct ServerConfig {
    /// HTTP server bind address
    pub http_host: IpAddr,
    /// HTTP server port (default: 3001)
    pub http_port: u16,
    /// Directory under which per-request workspaces are created
    pub temp_root: PathBuf,
    /// Expected value of the `x-api-key` header. Compared, never enforced.
    pub api_key: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Path or name of the git executable
    pub git_bin: PathBuf,
    /// Timeout applied to each git invocation
    pub command_timeout: Duration,
    /// Maximum accepted request body size in bytes
    pub body_limit: usize,
    /// Host that repository URLs must point at
    pub repo_host: String,
    /// Committer name written into the workspace repository
    pub commit_name: String,
    /// Committer email written into the workspace repository
    pub commit_email: String,
    /// Commit message used when the request carries none
    pub default_commit_message: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            http_port: 3001,
            temp_root: env::temp_dir(),
            api_key: None,
            log_level: String::from("info"),
            git_bin: PathBuf::from("git"),
            command_timeout: Duration::from_secs(30),
            body_limit: 100 * 1024 * 1024,
            repo_host: String::from("github.com"),
            commit_name: String::from("GitUploader"),
            commit_email: String::from("uploader@gituploader.com"),
            default_commit_message: String::from("Upload via GitUploader"),
        }
    }
}

// The API key stays out of startup logs.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_host", &self.http_host)
            .field("http_port", &self.http_port)
            .field("temp_root", &self.temp_root)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("log_level", &self.log_level)
            .field("git_bin", &self.git_bin)
            .field("command_timeout", &self.command_timeout)
            .field("body_limit", &self.body_limit)
            .field("repo_host", &self.repo_host)
            .field("commit_name", &self.commit_name)
            .field("commit_email", &self.commit_email)
            .field("default_commit_message", &self.default_commit_message)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `GITUPLOADER_HTTP_HOST`: HTTP bind address (default: 0.0.0.0)
    /// - `GITUPLOADER_HTTP_PORT`: HTTP port (default: 3001)
    /// - `GITUPLOADER_TEMP_ROOT`: Workspace root (default: OS temp dir)
    /// - `GITUPLOADER_API_KEY`: Expected `x-api-key` value
    /// - `GITUPLOADER_LOG_LEVEL`: Logging level
    /// - `GITUPLOADER_GIT_BIN`: git executable (default: git)
    /// - `GITUPLOADER_COMMAND_TIMEOUT_SECS`: Per-command timeout (default: 30)
    /// - `GITUPLOADER_BODY_LIMIT_BYTES`: Request body limit (default: 100 MiB)
    /// - `GITUPLOADER_REPO_HOST`: Accepted repository host (default: github.com)
    /// - `GITUPLOADER_COMMIT_NAME`, `GITUPLOADER_COMMIT_EMAIL`: Commit identity
    /// - `GITUPLOADER_DEFAULT_MESSAGE`: Fallback commit message
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(val) = env::var("GITUPLOADER_HTTP_HOST") {
            config.http_host = val
                .parse()
                .map_err(|_| ServerError::config(format!("Invalid HTTP host: {}", val)))?;
        }

        if let Ok(val) = env::var("GITUPLOADER_HTTP_PORT") {
            config.http_port = val
                .parse()
                .map_err(|_| ServerError::config(format!("Invalid HTTP port: {}", val)))?;
        }

        if let Ok(val) = env::var("GITUPLOADER_TEMP_ROOT") {
            config.temp_root = PathBuf::from(val);
        }

        if let Ok(val) = env::var("GITUPLOADER_API_KEY") {
            if !val.is_empty() {
                config.api_key = Some(val);
            }
        }

        if let Ok(val) = env::var("GITUPLOADER_LOG_LEVEL") {
            config.log_level = val;
        }

        if let Ok(val) = env::var("GITUPLOADER_GIT_BIN") {
            config.git_bin = PathBuf::from(val);
        }

        if let Ok(val) = env::var("GITUPLOADER_COMMAND_TIMEOUT_SECS") {
            let secs: u64 = val
                .parse()
                .map_err(|_| ServerError::config(format!("Invalid command timeout: {}", val)))?;
            config.command_timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = env::var("GITUPLOADER_BODY_LIMIT_BYTES") {
            config.body_limit = val
                .parse()
                .map_err(|_| ServerError::config(format!("Invalid body limit: {}", val)))?;
        }

        if let Ok(val) = env::var("GITUPLOADER_REPO_HOST") {
            config.repo_host = val;
        }

        if let Ok(val) = env::var("GITUPLOADER_COMMIT_NAME") {
            config.commit_name = val;
        }

        if let Ok(val) = env::var("GITUPLOADER_COMMIT_EMAIL") {
            config.commit_email = val;
        }

        if let Ok(val) = env::var("GITUPLOADER_DEFAULT_MESSAGE") {
            config.default_commit_message = val;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout.is_zero() {
            return Err(ServerError::config("Command timeout must be positive"));
        }

        if self.repo_host.trim().is_empty() {
            return Err(ServerError::config("Repository host cannot be empty"));
        }

        if self.default_commit_message.trim().is_empty() {
            return Err(ServerError::config("Default commit message cannot be empty"));
        }

        // Ensure the workspace root exists or can be created
        if !self.temp_root.exists() {
            std::fs::create_dir_all(&self.temp_root).map_err(|e| {
                ServerError::config(format!(
                    "Cannot create temp root {:?}: {}",
                    self.temp_root, e
                ))
            })?;
            info!("Created workspace root: {:?}", self.temp_root);
        }

        Ok(())
    }

    /// Get the HTTP socket address.
    pub fn http_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::new(self.http_host, self.http_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_port, 3001);
        assert_eq!(config.command_timeout, Duration::from_secs(30));
        assert_eq!(config.body_limit, 104_857_600);
        assert_eq!(config.repo_host, "github.com");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_http_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr().to_string(), "0.0.0.0:3001");
    }

    #[test]
    fn test_validate_creates_temp_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            temp_root: dir.path().join("nested").join("root"),
            ..ServerConfig::default()
        };
        config.validate().unwrap();
        assert!(config.temp_root.is_dir());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = ServerConfig {
            command_timeout: Duration::ZERO,
            ..ServerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = ServerConfig {
            api_key: Some("super-secret".to_string()),
            ..ServerConfig::default()
        };
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
