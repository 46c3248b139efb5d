//! Get-diff tool: show how proposed content differs from a file on disk.

use async_trait::async_trait;
use gitsage_core::error::ToolError;
use gitsage_core::tool::{Tool, ToolResult};
use gitsage_github::generate_patch;
use std::path::PathBuf;

use crate::input::GetDiffInput;
use crate::suggest_patch::match_trailing_newline;
use crate::workspace::resolve_user_path;

#[derive(Default)]
pub struct GetDiffTool {
    root: Option<PathBuf>,
}

impl GetDiffTool {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for GetDiffTool {
    fn name(&self) -> &str {
        "get_diff"
    }

    fn description(&self) -> &str {
        "Show a unified diff between a file's current content and proposed new content. Does not modify the file."
    }

    fn input_format(&self) -> &str {
        GetDiffInput::FORMAT
    }

    async fn execute(&self, input: &str) -> Result<ToolResult, ToolError> {
        let input: GetDiffInput = match input.parse() {
            Ok(parsed) => parsed,
            Err(e) => return Ok(ToolResult::failure(format!("Failed to parse input: {e}"))),
        };

        let path = resolve_user_path(self.root.as_deref(), &input.path);
        let current = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                return Ok(ToolResult::failure(format!(
                    "Could not read {}: {e}",
                    input.path
                )));
            }
        };

        let proposed = match_trailing_newline(&current, &input.proposed);
        let diff = generate_patch(&current, &proposed, input.path.trim_start_matches("./"));
        if diff.is_empty() {
            return Ok(ToolResult::ok(format!("No differences in {}.", input.path)));
        }
        Ok(ToolResult::ok(diff))
    }
}
