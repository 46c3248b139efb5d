//! Fetch a repository into a temporary directory.
//!
//! Public repositories are downloaded as a branch archive (`main`, then
//! `master`). If both downloads fail and a token is available, a shallow
//! `git clone` with the token in the URL is attempted instead. The
//! temporary directory lives exactly as long as the returned `ClonedRepo`.

use crate::client::GitHubClient;
use crate::error::GitHubError;
use crate::url::{RepoRef, parse_github_url};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Branches tried, in order, for the public archive download.
const ARCHIVE_BRANCHES: [&str; 2] = ["main", "master"];

pub const NO_TOKEN_FOR_PRIVATE_CLONE: &str =
    "Failed to clone repo publicly, and no GitHub token set for private clone";

/// How a repository ended up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneMethod {
    Archive { branch: String },
    Git,
}

/// A repository checked out into a temporary directory.
///
/// Dropping this removes the directory and everything in it.
#[derive(Debug)]
pub struct ClonedRepo {
    root: PathBuf,
    method: CloneMethod,
    _dir: TempDir,
}

impl ClonedRepo {
    /// Root of the working tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn method(&self) -> &CloneMethod {
        &self.method
    }
}

/// Downloads or clones repositories under a wall-clock limit.
#[derive(Debug, Clone)]
pub struct RepoCloner {
    client: GitHubClient,
    timeout: Duration,
}

impl RepoCloner {
    pub fn new(client: GitHubClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Fetch `repo_url` into a fresh temporary directory.
    pub async fn clone_repo(&self, repo_url: &str) -> Result<ClonedRepo, GitHubError> {
        let repo = parse_github_url(repo_url)?;
        let dir = tempfile::Builder::new().prefix("gitsage-").tempdir()?;

        info!(%repo, "Fetching repository");
        let fetched = tokio::time::timeout(self.timeout, self.fetch(&repo, dir.path()))
            .await
            .map_err(|_| GitHubError::Timeout {
                operation: format!("Cloning {repo}"),
                secs: self.timeout.as_secs(),
            })??;

        let (root, method) = fetched;
        debug!(%repo, root = %root.display(), ?method, "Repository ready");
        Ok(ClonedRepo {
            root,
            method,
            _dir: dir,
        })
    }

    async fn fetch(
        &self,
        repo: &RepoRef,
        workdir: &Path,
    ) -> Result<(PathBuf, CloneMethod), GitHubError> {
        for branch in ARCHIVE_BRANCHES {
            let dest = workdir.join(format!("archive-{branch}"));
            match self.download_archive(repo, branch, &dest).await {
                Ok(root) => {
                    return Ok((
                        root,
                        CloneMethod::Archive {
                            branch: branch.to_string(),
                        },
                    ));
                }
                Err(e) => debug!(%repo, branch, error = %e, "Archive download failed"),
            }
        }

        let Some(token) = self.client.token() else {
            warn!(%repo, "Public download failed and no token is configured");
            return Err(GitHubError::Clone(NO_TOKEN_FOR_PRIVATE_CLONE.into()));
        };

        let dest = workdir.join(&repo.repo);
        self.git_clone(repo, token, &dest).await?;
        Ok((dest, CloneMethod::Git))
    }

    async fn download_archive(
        &self,
        repo: &RepoRef,
        branch: &str,
        dest: &Path,
    ) -> Result<PathBuf, GitHubError> {
        let url = format!(
            "{}/{}/{}/archive/refs/heads/{}.zip",
            self.client.web_url(),
            repo.owner,
            repo.repo,
            branch
        );

        let response = self.client.http().get(&url).send().await?;
        if !response.status().is_success() {
            return Err(GitHubError::Api {
                status: response.status().as_u16(),
                message: format!("archive download for {branch} failed"),
            });
        }
        let bytes = response.bytes().await?.to_vec();

        extract_zip(bytes, dest.to_path_buf()).await?;
        single_top_level_dir(dest)
    }

    async fn git_clone(&self, repo: &RepoRef, token: &str, dest: &Path) -> Result<(), GitHubError> {
        let url = authenticated_clone_url(self.client.web_url(), token, repo);
        info!(%repo, "Falling back to git clone");

        let output = Command::new("git")
            .arg("clone")
            .arg("--depth=1")
            .arg(&url)
            .arg(dest)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).replace(token, "***");
            return Err(GitHubError::Clone(format!(
                "Failed to clone GitHub repo (public and private attempts failed): {}",
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// `https://<token>@host/owner/repo.git` for a `https://host` web base.
fn authenticated_clone_url(web_url: &str, token: &str, repo: &RepoRef) -> String {
    let (scheme, host) = web_url
        .split_once("://")
        .unwrap_or(("https", web_url));
    format!("{scheme}://{token}@{host}/{}/{}.git", repo.owner, repo.repo)
}

/// Unpack a zip archive into `dest`, refusing entries that escape it.
async fn extract_zip(bytes: Vec<u8>, dest: PathBuf) -> Result<(), GitHubError> {
    tokio::task::spawn_blocking(move || -> Result<(), GitHubError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| GitHubError::Archive(format!("Failed to read archive: {e}")))?;

        std::fs::create_dir_all(&dest)?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| GitHubError::Archive(format!("Failed to read archive entry: {e}")))?;

            let Some(name) = entry.enclosed_name().map(Path::to_path_buf) else {
                return Err(GitHubError::Archive(format!(
                    "Unsafe path in archive at entry {i}"
                )));
            };
            let out_path = dest.join(name);

            if entry.is_dir() {
                std::fs::create_dir_all(&out_path)?;
                continue;
            }

            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out_file = std::fs::File::create(&out_path)?;
            std::io::copy(&mut entry, &mut out_file)?;
        }

        Ok(())
    })
    .await
    .map_err(|e| GitHubError::Archive(format!("Extraction task failed: {e}")))?
}

/// Branch archives wrap everything in `<repo>-<branch>/`; unwrap it.
fn single_top_level_dir(dest: &Path) -> Result<PathBuf, GitHubError> {
    let entries: Vec<_> = std::fs::read_dir(dest)?.collect::<Result<_, _>>()?;
    if let [only] = entries.as_slice()
        && only.file_type()?.is_dir()
    {
        return Ok(only.path());
    }
    Ok(dest.to_path_buf())
}
