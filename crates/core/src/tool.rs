//! Tool trait: the abstraction over agent actions.
//!
//! Every tool takes a single text input and produces a single text output.
//! Multi-argument tools encode their fields as newline-delimited text; each
//! tool parses that into a typed input before doing any work.
//!
//! The registry is the boundary where failures stop: `invoke` always
//! returns text, whether the tool succeeded, reported a domain failure,
//! returned an error, or was never registered.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::error::ToolError;

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content, fed back to the model as the observation
    pub output: String,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    /// A domain-level failure the model should read and react to.
    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// A catalogue entry describing a tool to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// The textual input grammar the tool expects
    pub input_format: String,
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "lint_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// The input grammar, e.g. `<repo_path>\n<unified diff>`.
    fn input_format(&self) -> &str;

    /// Execute the tool with the given raw input.
    async fn execute(&self, input: &str) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for the prompt catalogue.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_format: self.input_format().to_string(),
        }
    }
}

/// What the registry hands back to the loop after a dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Name the model asked for
    pub tool: String,
    /// Whether a registered tool ran and reported success
    pub success: bool,
    /// Whether the name resolved to a registered tool
    pub known: bool,
    /// Text fed back to the model
    pub text: String,
}

/// A registry of available tools.
///
/// The agent loop uses this to:
/// 1. Describe the catalogue to the LLM
/// 2. Dispatch the single action the LLM picked on each step
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    /// Registration order, so the catalogue is stable across prompts.
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.to_definition())
            .collect()
    }

    /// List all registered tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name. Errors are returned as-is.
    pub async fn execute(&self, name: &str, input: &str) -> std::result::Result<ToolResult, ToolError> {
        let tool = self.tools.get(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(input).await
    }

    /// Dispatch a tool by name and always produce an observation.
    ///
    /// Unknown names execute nothing and list the valid names instead.
    pub async fn invoke(&self, name: &str, input: &str) -> Observation {
        if !self.tools.contains_key(name) {
            return Observation {
                tool: name.to_string(),
                success: false,
                known: false,
                text: self.unknown_tool_message(name),
            };
        }

        match self.execute(name, input).await {
            Ok(result) => Observation {
                tool: name.to_string(),
                success: result.success,
                known: true,
                text: result.output,
            },
            Err(e) => Observation {
                tool: name.to_string(),
                success: false,
                known: true,
                text: format!("Error: {e}"),
            },
        }
    }

    fn unknown_tool_message(&self, name: &str) -> String {
        if self.order.is_empty() {
            format!("Unknown tool '{name}'. No tools are available; give a Final Answer instead.")
        } else {
            format!(
                "Unknown tool '{name}'. Valid tools are: {}",
                self.order.join(", ")
            )
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
