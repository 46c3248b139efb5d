//! Errors from GitHub, git and patch operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("Invalid GitHub repo URL: {0}")]
    InvalidUrl(String),

    #[error("GitHub token not provided")]
    MissingToken,

    #[error("GitHub resource not found: {0}")]
    NotFound(String),

    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("{0}")]
    Clone(String),

    #[error("{0}")]
    Git(String),

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for GitHubError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest includes the URL, which may carry a token for clone URLs.
        GitHubError::Http(e.without_url().to_string())
    }
}

/// Errors from parsing or applying a unified diff.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("patch contains no file changes")]
    Empty,

    #[error("malformed hunk header at line {line}: {header}")]
    BadHunkHeader { line: usize, header: String },

    #[error("hunk at line {line} has a different number of lines than its header says: {header}")]
    HunkCountMismatch { line: usize, header: String },

    #[error("hunk at line {line} appears before any file header")]
    OrphanHunk { line: usize },

    #[error("patch path escapes the repository: {0}")]
    UnsafePath(String),

    #[error("hunk {hunk} in {path} does not fit the file ({lines} lines)")]
    HunkOutOfRange {
        path: String,
        hunk: usize,
        lines: usize,
    },

    #[error("hunk {hunk} in {path} does not match the file at line {line}")]
    ContextMismatch {
        path: String,
        hunk: usize,
        line: usize,
    },

    #[error("could not read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("could not write {path}: {reason}")]
    Write { path: String, reason: String },
}
