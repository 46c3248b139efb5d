//! Commit-and-push tool: stage everything in a local repository, commit and push.

use async_trait::async_trait;
use gitsage_core::error::ToolError;
use gitsage_core::tool::{Tool, ToolResult};
use gitsage_github::{GitHubError, commit_and_push};
use std::path::Path;
use std::time::Duration;

use crate::input::CommitPushInput;

pub struct CommitAndPushTool {
    timeout: Duration,
}

impl CommitAndPushTool {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Tool for CommitAndPushTool {
    fn name(&self) -> &str {
        "commit_and_push"
    }

    fn description(&self) -> &str {
        "Stage all changes in a local repository, commit them with the given message, and push to the configured remote. Only use after the user approved the changes."
    }

    fn input_format(&self) -> &str {
        CommitPushInput::FORMAT
    }

    async fn execute(&self, input: &str) -> Result<ToolResult, ToolError> {
        let input: CommitPushInput = match input.parse() {
            Ok(parsed) => parsed,
            Err(e) => return Ok(ToolResult::failure(format!("Failed to parse input: {e}"))),
        };

        match commit_and_push(Path::new(&input.repo_path), &input.message, self.timeout).await {
            Ok(outcome) => Ok(ToolResult::ok(outcome.to_string())),
            Err(GitHubError::Timeout { secs, .. }) => Err(ToolError::Timeout {
                tool_name: "commit_and_push".into(),
                timeout_secs: secs,
            }),
            Err(e) => Ok(ToolResult::failure(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_message_fails_to_parse() {
        let tool = CommitAndPushTool::new(Duration::from_secs(5));
        let result = tool.execute("/tmp/repo").await.unwrap();
        assert!(result.output.starts_with("Failed to parse input: missing commit message"));
    }

    #[tokio::test]
    async fn nonexistent_repo_is_descriptive() {
        let tool = CommitAndPushTool::new(Duration::from_secs(5));
        let result = tool.execute("/no/such/repo\nFix lint").await.unwrap();
        assert!(!result.success);
        assert!(result.output.starts_with("Path does not exist or is not a directory"));
    }
}
