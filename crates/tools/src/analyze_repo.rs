//! Analyze-repository tool: fetch a GitHub repository and answer a
//! question about it from a sample of its files.

use async_trait::async_trait;
use gitsage_core::error::ToolError;
use gitsage_core::tool::{Tool, ToolResult};
use gitsage_github::RepoCloner;
use std::sync::Arc;
use tracing::warn;

use crate::input::AnalyzeInput;
use crate::sampler::{DEFAULT_QUESTION, RepositorySampler};

pub struct AnalyzeRepositoryTool {
    cloner: RepoCloner,
    sampler: Arc<RepositorySampler>,
}

impl AnalyzeRepositoryTool {
    pub fn new(cloner: RepoCloner, sampler: Arc<RepositorySampler>) -> Self {
        Self { cloner, sampler }
    }
}

#[async_trait]
impl Tool for AnalyzeRepositoryTool {
    fn name(&self) -> &str {
        "analyze_repository"
    }

    fn description(&self) -> &str {
        "Download a GitHub repository and answer a question about it (purpose, structure, how to run it) from its key files. Use this first for any question about a repository."
    }

    fn input_format(&self) -> &str {
        AnalyzeInput::FORMAT
    }

    async fn execute(&self, input: &str) -> Result<ToolResult, ToolError> {
        let input: AnalyzeInput = match input.parse() {
            Ok(parsed) => parsed,
            Err(e) => return Ok(ToolResult::failure(format!("Failed to parse input: {e}"))),
        };

        let cloned = match self.cloner.clone_repo(&input.repo_url).await {
            Ok(cloned) => cloned,
            Err(e) => {
                warn!(repo = %input.repo_url, error = %e, "Repository fetch failed");
                return Ok(ToolResult::failure(format!(
                    "Failed to clone repository: {e}"
                )));
            }
        };

        let question = input.question.as_deref().unwrap_or(DEFAULT_QUESTION);
        let answer = self
            .sampler
            .answer(cloned.root(), question)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "analyze_repository".into(),
                reason: e.to_string(),
            })?;

        // `cloned` drops here and takes the temporary checkout with it.
        Ok(ToolResult::ok(answer))
    }
}
