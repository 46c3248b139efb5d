//! Update-remote-file tool: commit new content for one file straight to
//! GitHub through the contents API.

use async_trait::async_trait;
use gitsage_core::error::ToolError;
use gitsage_core::tool::{Tool, ToolResult};
use gitsage_github::{GitHubClient, parse_github_url};
use tracing::info;

use crate::input::UpdateRemoteInput;

pub const DEFAULT_BRANCH: &str = "main";

pub struct UpdateRemoteFileTool {
    client: GitHubClient,
    branch: String,
}

impl UpdateRemoteFileTool {
    pub fn new(client: GitHubClient) -> Self {
        Self {
            client,
            branch: DEFAULT_BRANCH.into(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }
}

#[async_trait]
impl Tool for UpdateRemoteFileTool {
    fn name(&self) -> &str {
        "update_remote_file"
    }

    fn description(&self) -> &str {
        "Replace a file's content in a GitHub repository with a single commit on the main branch. Creates the file if it does not exist."
    }

    fn input_format(&self) -> &str {
        UpdateRemoteInput::FORMAT
    }

    async fn execute(&self, input: &str) -> Result<ToolResult, ToolError> {
        let input: UpdateRemoteInput = match input.parse() {
            Ok(parsed) => parsed,
            Err(e) => return Ok(ToolResult::failure(format!("Failed to parse input: {e}"))),
        };

        let repo = match parse_github_url(&input.repo_url) {
            Ok(repo) => repo,
            Err(e) => return Ok(ToolResult::failure(e.to_string())),
        };

        let mut content = input.content;
        if !content.ends_with('\n') {
            content.push('\n');
        }

        match self
            .client
            .put_file(&repo, &input.path, &content, &input.message, &self.branch)
            .await
        {
            Ok(commit) => {
                info!(%repo, path = %input.path, sha = %commit.commit_sha, "Remote file updated");
                let mut out = format!(
                    "Updated {} in {repo} on {} (commit {}).",
                    input.path, self.branch, commit.commit_sha
                );
                if let Some(url) = commit.html_url {
                    out.push_str(&format!("\n{url}"));
                }
                Ok(ToolResult::ok(out))
            }
            Err(e) => Ok(ToolResult::failure(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const INPUT: &str = "https://github.com/octo/demo\nREADME.md\nDocs: typo\n# Demo";

    #[tokio::test]
    async fn no_token_is_reported_without_requests() {
        let tool = UpdateRemoteFileTool::new(GitHubClient::new(None));
        let result = tool.execute(INPUT).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.output, "GitHub token not provided");
    }

    #[tokio::test]
    async fn commits_content_with_trailing_newline() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/octo/demo/contents/README.md")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/repos/octo/demo/contents/README.md")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "message": "Docs: typo",
                "branch": "main",
                // "# Demo\n"
                "content": "IyBEZW1vCg==",
            })))
            .with_status(201)
            .with_body(r#"{"content":null,"commit":{"sha":"c0ffee"}}"#)
            .create_async()
            .await;

        let client = GitHubClient::new(Some("ghp_test".into())).with_api_url(server.url());
        let result = UpdateRemoteFileTool::new(client).execute(INPUT).await.unwrap();

        put.assert_async().await;
        assert!(result.success, "{}", result.output);
        assert_eq!(
            result.output,
            "Updated README.md in octo/demo on main (commit c0ffee)."
        );
    }

    #[tokio::test]
    async fn bad_repo_url_is_failure() {
        let tool = UpdateRemoteFileTool::new(GitHubClient::new(Some("t".into())));
        let result = tool
            .execute("https://gitlab.com/o/r\nREADME.md\nmsg\nbody")
            .await
            .unwrap();
        assert!(result.output.starts_with("Invalid GitHub repo URL"));
    }
}
