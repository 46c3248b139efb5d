//! GitHub REST client.
//!
//! Read operations work anonymously for public repositories. Anything that
//! writes (file updates, branches, pull requests) needs a bearer token and
//! fails with `GitHubError::MissingToken` before any request is sent.

use crate::error::GitHubError;
use crate::url::RepoRef;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_WEB_URL: &str = "https://github.com";

/// Summary of a repository as returned by `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoInfo {
    pub owner: String,
    pub repo: String,
    pub default_branch: Option<String>,
    pub description: Option<String>,
    pub private: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ApiRepo {
    default_branch: Option<String>,
    description: Option<String>,
    private: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    #[serde(default)]
    pub protected: bool,
}

/// Result of a contents write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCommit {
    pub path: String,
    pub commit_sha: String,
    pub html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiContentWrite {
    content: Option<ApiContentRef>,
    commit: ApiCommitRef,
}

#[derive(Debug, Deserialize)]
struct ApiContentRef {
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiCommitRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiFileMeta {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiGitRef {
    object: ApiCommitRef,
}

#[derive(Debug, Deserialize)]
struct ApiPull {
    html_url: String,
}

/// Thin client over the GitHub REST API.
#[derive(Clone)]
pub struct GitHubClient {
    api_url: String,
    web_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .field("web_url", &self.web_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            web_url: DEFAULT_WEB_URL.into(),
            token: token.filter(|t| !t.trim().is_empty()),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_web_url(mut self, web_url: impl Into<String>) -> Self {
        self.web_url = web_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn web_url(&self) -> &str {
        &self.web_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    fn require_token(&self) -> Result<&str, GitHubError> {
        self.token.as_deref().ok_or(GitHubError::MissingToken)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.api_url, path);
        let mut builder = self
            .client
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", concat!("gitsage/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T, GitHubError> {
        let response = builder.send().await?;
        let status = response.status().as_u16();

        if status == 404 {
            return Err(GitHubError::NotFound(what.to_string()));
        }
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status, what, "GitHub API returned error");
            return Err(GitHubError::Api { status, message });
        }

        Ok(response.json().await?)
    }

    /// `GET /repos/{owner}/{repo}`
    pub async fn repo_info(&self, repo: &RepoRef) -> Result<RepoInfo, GitHubError> {
        debug!(%repo, "Fetching repository metadata");
        let path = format!("/repos/{}/{}", repo.owner, repo.repo);
        let meta: ApiRepo = self
            .send(self.request(reqwest::Method::GET, &path), &repo.to_string())
            .await?;

        Ok(RepoInfo {
            owner: repo.owner.clone(),
            repo: repo.repo.clone(),
            default_branch: meta.default_branch,
            description: meta.description,
            private: meta.private,
        })
    }

    /// `GET /repos/{owner}/{repo}/branches`
    pub async fn branches(&self, repo: &RepoRef) -> Result<Vec<Branch>, GitHubError> {
        let path = format!("/repos/{}/{}/branches", repo.owner, repo.repo);
        self.send(self.request(reqwest::Method::GET, &path), &repo.to_string())
            .await
    }

    /// `GET /repos/{owner}/{repo}/contents/{path}`, passed through untouched.
    ///
    /// GitHub answers with an array for directories and an object for files.
    pub async fn contents(
        &self,
        repo: &RepoRef,
        path: &str,
    ) -> Result<serde_json::Value, GitHubError> {
        let api_path = format!(
            "/repos/{}/{}/contents/{}",
            repo.owner,
            repo.repo,
            path.trim_start_matches('/')
        );
        self.send(
            self.request(reqwest::Method::GET, &api_path),
            &format!("{repo}:{path}"),
        )
        .await
    }

    /// Blob sha of `path` on `branch`, or `None` if the file does not exist.
    pub async fn file_sha(
        &self,
        repo: &RepoRef,
        path: &str,
        branch: &str,
    ) -> Result<Option<String>, GitHubError> {
        let api_path = format!(
            "/repos/{}/{}/contents/{}",
            repo.owner,
            repo.repo,
            path.trim_start_matches('/')
        );
        let builder = self
            .request(reqwest::Method::GET, &api_path)
            .query(&[("ref", branch)]);
        match self.send::<ApiFileMeta>(builder, path).await {
            Ok(meta) => Ok(Some(meta.sha)),
            Err(GitHubError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write `content` to `path` on `branch` as a single commit.
    ///
    /// Existing files are updated in place (their current sha is fetched
    /// first); missing files are created.
    pub async fn put_file(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
    ) -> Result<FileCommit, GitHubError> {
        self.require_token()?;
        let sha = self.file_sha(repo, path, branch).await?;

        let mut body = serde_json::json!({
            "message": message,
            "content": BASE64.encode(content.as_bytes()),
            "branch": branch,
        });
        if let Some(sha) = sha {
            body["sha"] = serde_json::json!(sha);
        }

        debug!(%repo, path, branch, "Committing file through contents API");
        let api_path = format!(
            "/repos/{}/{}/contents/{}",
            repo.owner,
            repo.repo,
            path.trim_start_matches('/')
        );
        let written: ApiContentWrite = self
            .send(self.request(reqwest::Method::PUT, &api_path).json(&body), path)
            .await?;

        Ok(FileCommit {
            path: path.to_string(),
            commit_sha: written.commit.sha,
            html_url: written.content.and_then(|c| c.html_url),
        })
    }

    /// Create `new_branch` pointing at the head of `from_branch`.
    pub async fn create_branch(
        &self,
        repo: &RepoRef,
        new_branch: &str,
        from_branch: &str,
    ) -> Result<(), GitHubError> {
        self.require_token()?;

        let ref_path = format!(
            "/repos/{}/{}/git/ref/heads/{}",
            repo.owner, repo.repo, from_branch
        );
        let head: ApiGitRef = self
            .send(self.request(reqwest::Method::GET, &ref_path), from_branch)
            .await?;

        let refs_path = format!("/repos/{}/{}/git/refs", repo.owner, repo.repo);
        let body = serde_json::json!({
            "ref": format!("refs/heads/{new_branch}"),
            "sha": head.object.sha,
        });
        let _: serde_json::Value = self
            .send(
                self.request(reqwest::Method::POST, &refs_path).json(&body),
                new_branch,
            )
            .await?;
        Ok(())
    }

    /// Open a pull request and return its URL.
    pub async fn create_pull_request(
        &self,
        repo: &RepoRef,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<String, GitHubError> {
        self.require_token()?;
        let path = format!("/repos/{}/{}/pulls", repo.owner, repo.repo);
        let payload = serde_json::json!({
            "title": title,
            "body": body,
            "head": head,
            "base": base,
        });
        let pull: ApiPull = self
            .send(
                self.request(reqwest::Method::POST, &path).json(&payload),
                &repo.to_string(),
            )
            .await?;
        Ok(pull.html_url)
    }
}
