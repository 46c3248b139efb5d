//! List files in the local repository the gateway was started with.

use async_trait::async_trait;
use gitsage_core::error::ToolError;
use gitsage_core::tool::{Tool, ToolResult};
use std::path::PathBuf;

use crate::input::ListFilesInput;
use crate::workspace::{resolve_in_root, walk_files_blocking};

const MAX_LISTED: usize = 500;

pub struct ListRepositoryFilesTool {
    root: PathBuf,
}

impl ListRepositoryFilesTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for ListRepositoryFilesTool {
    fn name(&self) -> &str {
        "list_repository_files"
    }

    fn description(&self) -> &str {
        "List files in the local repository, optionally under one subdirectory. Paths are relative to the repository root."
    }

    fn input_format(&self) -> &str {
        "<optional subdirectory>"
    }

    async fn execute(&self, input: &str) -> Result<ToolResult, ToolError> {
        let input: ListFilesInput = input.parse().unwrap_or_default();

        let base = match &input.subdir {
            Some(subdir) => match resolve_in_root(&self.root, subdir) {
                Ok(path) if path.is_dir() => path,
                Ok(_) => {
                    return Ok(ToolResult::failure(format!("'{subdir}' is not a directory")));
                }
                Err(e) => return Ok(ToolResult::failure(e.to_string())),
            },
            None => self.root.clone(),
        };

        let prefix = input.subdir.map(|s| format!("{s}/")).unwrap_or_default();
        let files = walk_files_blocking(&base).await;
        if files.is_empty() {
            return Ok(ToolResult::ok("No files found."));
        }

        let mut lines: Vec<String> = files
            .iter()
            .take(MAX_LISTED)
            .map(|f| format!("{prefix}{f}"))
            .collect();
        if files.len() > MAX_LISTED {
            lines.push(format!("... and {} more", files.len() - MAX_LISTED));
        }
        Ok(ToolResult::ok(lines.join("\n")))
    }
}
