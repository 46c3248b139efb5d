//! Apply-patch tool: apply a unified diff to a local working tree.

use async_trait::async_trait;
use gitsage_core::error::ToolError;
use gitsage_core::tool::{Tool, ToolResult};
use gitsage_github::apply_patch;
use std::path::PathBuf;
use tracing::info;

use crate::input::ApplyPatchInput;

pub struct ApplyPatchTool;

fn failed(reason: impl std::fmt::Display) -> ToolResult {
    ToolResult::failure(format!("Failed to apply patch: {reason}"))
}

#[async_trait]
impl Tool for ApplyPatchTool {
    fn name(&self) -> &str {
        "apply_patch"
    }

    fn description(&self) -> &str {
        "Apply a unified diff to a local repository. Every hunk must match the current files or nothing is changed."
    }

    fn input_format(&self) -> &str {
        ApplyPatchInput::FORMAT
    }

    async fn execute(&self, input: &str) -> Result<ToolResult, ToolError> {
        let input: ApplyPatchInput = match input.parse() {
            Ok(parsed) => parsed,
            Err(e) => return Ok(failed(e)),
        };

        let root = PathBuf::from(&input.repo_path);
        if !root.is_dir() {
            return Ok(failed(format!(
                "repository path {} is not a directory",
                input.repo_path
            )));
        }

        let diff = input.diff;
        let applied = tokio::task::spawn_blocking(move || apply_patch(&root, &diff))
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "apply_patch".into(),
                reason: e.to_string(),
            })?;

        match applied {
            Ok(files) => {
                info!(repo = %input.repo_path, files = files.len(), "Patch applied");
                let list: Vec<String> = files.iter().map(|f| format!("- {f}")).collect();
                Ok(ToolResult::ok(format!(
                    "Patch applied to {} file(s):\n{}",
                    files.len(),
                    list.join("\n")
                )))
            }
            Err(e) => Ok(failed(e)),
        }
    }
}
