//! Repository URL parsing.

use url::Url;

use crate::error::{Result, ServerError};

/// The repository an upload is published to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
    pub owner: String,
    pub repo: String,
    url: Url,
}

impl RepoTarget {
    /// Parse `[scheme://]host/owner/repo[.git]` for the given host.
    ///
    /// A URL without a scheme is taken as `https`. Credentials, query and
    /// fragment already present in the input are dropped.
    pub fn parse(repo_url: &str, host: &str) -> Result<Self> {
        let invalid = || ServerError::validation("Invalid GitHub repository URL");

        let repo_url = repo_url.trim();
        let normalized = if repo_url.contains("://") {
            repo_url.to_string()
        } else {
            format!("https://{repo_url}")
        };

        let mut url = Url::parse(&normalized).map_err(|_| invalid())?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(invalid());
        }
        if !url
            .host_str()
            .is_some_and(|h| h.eq_ignore_ascii_case(host))
        {
            return Err(invalid());
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        let [owner, repo] = segments.as_slice() else {
            return Err(invalid());
        };
        let repo = repo.strip_suffix(".git").unwrap_or(*repo);
        if repo.is_empty() {
            return Err(invalid());
        }
        let (owner, repo) = (owner.to_string(), repo.to_string());

        // Infallible for http(s) URLs with a host.
        let _ = url.set_username("");
        let _ = url.set_password(None);
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self { owner, repo, url })
    }

    /// `owner/repo`, as shown to users.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// The remote URL without credentials.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// The remote URL with `token` as its userinfo.
    pub fn authenticated_url(&self, token: &str) -> Result<String> {
        let mut url = self.url.clone();
        url.set_username(token)
            .map_err(|_| ServerError::internal("Cannot embed credentials in repository URL"))?;
        Ok(url.into())
    }
}
