//! Local git operations: stage everything, commit, push.

use crate::error::GitHubError;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// What `commit_and_push` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// A commit was created and pushed; `log` is the collected stdout.
    Pushed { log: String },
    NothingToCommit,
}

impl std::fmt::Display for PushOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushOutcome::Pushed { log } if log.is_empty() => {
                write!(f, "Changes committed and pushed.")
            }
            PushOutcome::Pushed { log } => write!(f, "Changes committed and pushed.\n{log}"),
            PushOutcome::NothingToCommit => write!(f, "Nothing to commit. Working tree clean."),
        }
    }
}

/// Run `git add .`, `git commit -m <message>` and `git push` in `repo_path`.
///
/// Each command gets its own `timeout`. The first failing command stops the
/// sequence; a commit with nothing staged is reported as `NothingToCommit`.
pub async fn commit_and_push(
    repo_path: &Path,
    message: &str,
    timeout: Duration,
) -> Result<PushOutcome, GitHubError> {
    if !repo_path.is_dir() {
        return Err(GitHubError::Git(format!(
            "Path does not exist or is not a directory: {}",
            repo_path.display()
        )));
    }

    let commands: [Vec<&str>; 3] = [
        vec!["add", "."],
        vec!["commit", "-m", message],
        vec!["push"],
    ];

    let mut log = Vec::new();
    for args in commands {
        let rendered = format!("git {}", args.join(" "));
        debug!(repo = %repo_path.display(), command = %rendered, "Running git");

        let output = tokio::time::timeout(
            timeout,
            Command::new("git")
                .args(&args)
                .current_dir(repo_path)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| GitHubError::Timeout {
            operation: rendered.clone(),
            secs: timeout.as_secs(),
        })??;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            if stdout.contains("nothing to commit") || stderr.contains("nothing to commit") {
                return Ok(PushOutcome::NothingToCommit);
            }
            return Err(GitHubError::Git(format!("Error running {rendered}:\n{stderr}")));
        }

        if !stdout.is_empty() {
            log.push(stdout);
        }
    }

    info!(repo = %repo_path.display(), "Changes committed and pushed");
    Ok(PushOutcome::Pushed {
        log: log.join("\n"),
    })
}
