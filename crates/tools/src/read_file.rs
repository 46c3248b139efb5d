//! Read one file from the local repository the gateway was started with.

use async_trait::async_trait;
use gitsage_core::error::ToolError;
use gitsage_core::tool::{Tool, ToolResult};
use std::path::PathBuf;

use crate::input::ReadFileInput;
use crate::workspace::{read_capped, resolve_in_root};

const DEFAULT_MAX_CHARS: usize = 8000;

pub struct ReadFileContentTool {
    root: PathBuf,
    max_chars: usize,
}

impl ReadFileContentTool {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

#[async_trait]
impl Tool for ReadFileContentTool {
    fn name(&self) -> &str {
        "read_file_content"
    }

    fn description(&self) -> &str {
        "Read a file from the local repository. The path is relative to the repository root; long files are cut off."
    }

    fn input_format(&self) -> &str {
        ReadFileInput::FORMAT
    }

    async fn execute(&self, input: &str) -> Result<ToolResult, ToolError> {
        let input: ReadFileInput = match input.parse() {
            Ok(parsed) => parsed,
            Err(e) => return Ok(ToolResult::failure(format!("Failed to parse input: {e}"))),
        };

        if let Err(e) = resolve_in_root(&self.root, &input.path) {
            return Ok(ToolResult::failure(e.to_string()));
        }

        match read_capped(&self.root, &input.path, self.max_chars).await {
            Some(content) => Ok(ToolResult::ok(content)),
            None => Ok(ToolResult::failure(format!(
                "'{}' is not a readable file",
                input.path
            ))),
        }
    }
}
