//! GitHub pass-through routes and the patch-to-pull-request flow.
//!
//! Failures are reported as `200 {"error": ...}` like `/query-repo`.

use axum::extract::{Query, State};
use axum::response::Json;
use gitsage_github::{GitHubClient, GitHubError, RepoCloner, apply_patch, parse_github_url};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{info, warn};

use crate::SharedState;

pub const PR_COMMIT_MESSAGE: &str = "fix: automated patch";
pub const PR_TITLE: &str = "Suggested Fix from AI";
pub const PR_BODY: &str = "This PR was generated from an automated analysis of the repo.";
pub const LOCAL_ONLY_STATUS: &str = "Patch applied locally (public mode)";

#[derive(Debug, Deserialize)]
pub struct RepoQuery {
    pub repo_url: String,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PrRequest {
    pub repo_url: String,
    pub patch: String,
    #[serde(default)]
    pub github_token: Option<String>,
}

fn error_json(e: impl std::fmt::Display) -> Json<Value> {
    Json(json!({ "error": e.to_string() }))
}

fn respond<T: serde::Serialize>(result: Result<T, GitHubError>) -> Json<Value> {
    match result.and_then(|v| serde_json::to_value(v).map_err(|e| GitHubError::Http(e.to_string()))) {
        Ok(value) => Json(value),
        Err(e) => error_json(e),
    }
}

pub async fn repo_info(
    State(state): State<SharedState>,
    Query(query): Query<RepoQuery>,
) -> Json<Value> {
    let client = state.github_client(None);
    let result = match parse_github_url(&query.repo_url) {
        Ok(repo) => client.repo_info(&repo).await,
        Err(e) => Err(e),
    };
    respond(result)
}

pub async fn branches(
    State(state): State<SharedState>,
    Query(query): Query<RepoQuery>,
) -> Json<Value> {
    let client = state.github_client(None);
    let result = match parse_github_url(&query.repo_url) {
        Ok(repo) => client.branches(&repo).await,
        Err(e) => Err(e),
    };
    respond(result)
}

pub async fn files(
    State(state): State<SharedState>,
    Query(query): Query<RepoQuery>,
) -> Json<Value> {
    let client = state.github_client(None);
    let path = query.path.as_deref().unwrap_or_default();
    let result = match parse_github_url(&query.repo_url) {
        Ok(repo) => client.contents(&repo, path).await,
        Err(e) => Err(e),
    };
    respond(result)
}

/// Apply `patch` to a fresh clone and, with a token, open a pull request
/// carrying the result.
pub async fn create_pr(
    State(state): State<SharedState>,
    Json(request): Json<PrRequest>,
) -> Json<Value> {
    let client = state.github_client(request.github_token.as_deref());
    let clone_timeout = Duration::from_secs(state.config.timeouts.clone_secs);
    match open_patch_pr(client, clone_timeout, &request.repo_url, request.patch).await {
        Ok(value) => Json(value),
        Err(e) => {
            warn!(repo = %request.repo_url, error = %e, "Patch request failed");
            error_json(e)
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum PrFlowError {
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error("Failed to apply patch: {0}")]
    Patch(#[from] gitsage_github::PatchError),

    #[error("Patch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

async fn open_patch_pr(
    client: GitHubClient,
    clone_timeout: Duration,
    repo_url: &str,
    patch: String,
) -> Result<Value, PrFlowError> {
    let repo = parse_github_url(repo_url)?;
    let cloned = RepoCloner::new(client.clone(), clone_timeout)
        .clone_repo(repo_url)
        .await?;

    let root = cloned.root().to_path_buf();
    let touched = tokio::task::spawn_blocking(move || apply_patch(&root, &patch)).await??;
    info!(%repo, files = touched.len(), "Patch applied to clone");

    if !client.has_token() {
        return Ok(json!({ "status": LOCAL_ONLY_STATUS }));
    }

    let base = client
        .repo_info(&repo)
        .await?
        .default_branch
        .unwrap_or_else(|| "main".to_string());
    let branch = format!("auto-patch-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    client.create_branch(&repo, &branch, &base).await?;

    for path in &touched {
        match tokio::fs::read_to_string(cloned.root().join(path)).await {
            Ok(content) => {
                client
                    .put_file(&repo, path, &content, PR_COMMIT_MESSAGE, &branch)
                    .await?;
            }
            // Deleted by the patch; the contents API cannot express that here.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(%repo, path = %path, "Skipping file removed by patch");
            }
            Err(e) => return Err(GitHubError::Io(e).into()),
        }
    }

    let url = client
        .create_pull_request(&repo, PR_TITLE, PR_BODY, &branch, &base)
        .await?;
    info!(%repo, url = %url, "Pull request opened");
    Ok(json!({ "status": "PR created", "url": url }))
}
