//! Suggest-patch tool: let the model rewrite a file, return the change as
//! a unified diff. Nothing is written to disk.

use async_trait::async_trait;
use gitsage_core::error::ToolError;
use gitsage_core::message::Message;
use gitsage_core::provider::{Provider, ProviderRequest};
use gitsage_core::tool::{Tool, ToolResult};
use gitsage_github::generate_patch;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::input::SuggestPatchInput;
use crate::workspace::resolve_user_path;

/// Room for a whole rewritten file.
const REWRITE_MAX_TOKENS: u32 = 4096;

const REWRITE_SYSTEM_PROMPT: &str = "You are a careful senior engineer. Rewrite the file so it \
satisfies the instructions and change nothing else. Reply with the complete new file content only: \
no explanations and no code fences.";

pub struct SuggestPatchTool {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    root: Option<PathBuf>,
}

impl SuggestPatchTool {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.3,
            root: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_root(mut self, root: Option<PathBuf>) -> Self {
        self.root = root;
        self
    }
}

/// Drop a surrounding markdown fence if the model added one anyway.
pub(crate) fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return reply;
    };
    let body = after_open
        .split_once('\n')
        .map(|(_, body)| body)
        .unwrap_or_default();
    body.trim_end().strip_suffix("```").unwrap_or(body)
}

/// Give `proposed` the same trailing-newline convention as `original`.
pub(crate) fn match_trailing_newline(original: &str, proposed: &str) -> String {
    let mut out = proposed.trim_end_matches('\n').to_string();
    if original.ends_with('\n') || original.is_empty() {
        out.push('\n');
    }
    out
}

#[async_trait]
impl Tool for SuggestPatchTool {
    fn name(&self) -> &str {
        "suggest_patch"
    }

    fn description(&self) -> &str {
        "Ask the model to rewrite a file according to instructions and return the proposed change as a unified diff. Does not modify the file."
    }

    fn input_format(&self) -> &str {
        SuggestPatchInput::FORMAT
    }

    async fn execute(&self, input: &str) -> Result<ToolResult, ToolError> {
        let input: SuggestPatchInput = match input.parse() {
            Ok(parsed) => parsed,
            Err(e) => return Ok(ToolResult::failure(format!("Failed to parse input: {e}"))),
        };

        let path = resolve_user_path(self.root.as_deref(), &input.path);
        let original = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                return Ok(ToolResult::failure(format!(
                    "Could not read {}: {e}",
                    input.path
                )));
            }
        };

        let prompt = format!(
            "File: {}\n\nInstructions: {}\n\nCurrent content:\n{original}",
            input.path, input.instructions
        );
        let request = ProviderRequest::new(
            self.model.clone(),
            vec![Message::system(REWRITE_SYSTEM_PROMPT), Message::user(prompt)],
        )
        .with_temperature(self.temperature)
        .with_max_tokens(Some(REWRITE_MAX_TOKENS));

        debug!(path = %input.path, "Requesting rewrite");
        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "suggest_patch".into(),
                reason: e.to_string(),
            })?;

        let rewritten = match_trailing_newline(&original, strip_code_fence(&response.message.content));
        let patch = generate_patch(&original, &rewritten, input.path.trim_start_matches("./"));
        if patch.is_empty() {
            return Ok(ToolResult::ok(format!(
                "The suggested change leaves {} unchanged; no patch needed.",
                input.path
            )));
        }

        Ok(ToolResult::ok(patch))
    }
}
