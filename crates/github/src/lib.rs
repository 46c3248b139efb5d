//! GitHub and git plumbing for gitsage.
//!
//! - [`url`]: `owner/repo` extraction from repository URLs
//! - [`client`]: REST metadata, contents, file updates, pull requests
//! - [`clone`]: archive download with a `git clone` fallback
//! - [`git`]: local commit and push
//! - [`patch`]: unified diff generation and application

pub mod client;
pub mod clone;
pub mod error;
pub mod git;
pub mod patch;
pub mod url;

pub use client::{Branch, FileCommit, GitHubClient, RepoInfo};
pub use clone::{CloneMethod, ClonedRepo, RepoCloner};
pub use error::{GitHubError, PatchError};
pub use git::{PushOutcome, commit_and_push};
pub use patch::{FilePatch, apply_patch, generate_patch, parse_patch};
pub use url::{RepoRef, parse_github_url};
