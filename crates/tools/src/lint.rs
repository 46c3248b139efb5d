//! Lint tool: run pylint on one file and summarize the findings.

use async_trait::async_trait;
use gitsage_core::error::ToolError;
use gitsage_core::tool::{Tool, ToolResult};
use regex_lite::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::input::LintInput;
use crate::workspace::resolve_user_path;

/// `path:line:col: message (code)`
static PYLINT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?):(\d+):\d+: (.+?) \((.+?)\)$").expect("pylint line pattern is valid")
});

/// Pylint's own message id at the front of the message, e.g. `C0114: `.
static MESSAGE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]\d{4}): (.*)$").expect("message id pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintCategory {
    Error,
    Warning,
    Convention,
    Refactor,
    Info,
}

impl std::fmt::Display for LintCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LintCategory::Error => "Error",
            LintCategory::Warning => "Warning",
            LintCategory::Convention => "Convention",
            LintCategory::Refactor => "Refactor",
            LintCategory::Info => "Info",
        };
        f.write_str(label)
    }
}

/// Category from the first letter of a pylint message id.
pub fn categorize_lint(code: &str) -> LintCategory {
    match code.chars().next() {
        Some('E') | Some('F') => LintCategory::Error,
        Some('W') => LintCategory::Warning,
        Some('C') => LintCategory::Convention,
        Some('R') => LintCategory::Refactor,
        _ => LintCategory::Info,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    pub file: String,
    pub line: u32,
    /// Message id such as `C0114`, or the symbolic name when no id is given.
    pub code: String,
    pub message: String,
    pub category: LintCategory,
}

/// Parse pylint's text output. Lines that are not findings are ignored.
pub fn parse_pylint_output(output: &str) -> Vec<LintFinding> {
    output
        .lines()
        .filter_map(|line| {
            let caps = PYLINT_LINE.captures(line.trim())?;
            let file = caps[1].trim().to_string();
            let line_no = caps[2].parse().ok()?;
            let raw_message = caps[3].trim();
            let symbol = caps[4].to_string();

            let (code, message) = match MESSAGE_ID.captures(raw_message) {
                Some(id) => (id[1].to_string(), format!("{} ({symbol})", &id[2])),
                None => (symbol, raw_message.to_string()),
            };

            Some(LintFinding {
                file,
                line: line_no,
                category: categorize_lint(&code),
                code,
                message,
            })
        })
        .collect()
}

fn summarize(path: &str, findings: &[LintFinding]) -> String {
    if findings.is_empty() {
        return format!("No lint issues found in {path}.");
    }
    let mut out = format!("Found {} issue(s) in {path}:", findings.len());
    for f in findings {
        out.push_str(&format!(
            "\n- [{}] line {}: {} ({})",
            f.category, f.line, f.message, f.code
        ));
    }
    out
}

/// Runs `pylint <path> -rn --score=n` under a timeout.
pub struct LintFileTool {
    root: Option<PathBuf>,
    program: String,
    timeout: Duration,
}

impl LintFileTool {
    pub fn new(timeout: Duration) -> Self {
        Self {
            root: None,
            program: "pylint".into(),
            timeout,
        }
    }

    /// Resolve relative paths against a local repository.
    pub fn with_root(mut self, root: Option<PathBuf>) -> Self {
        self.root = root;
        self
    }

    /// Use a different linter executable with the same CLI.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl Tool for LintFileTool {
    fn name(&self) -> &str {
        "lint_file"
    }

    fn description(&self) -> &str {
        "Run the Python linter (pylint) on a single file and list the issues found, grouped as Error, Warning, Convention, Refactor or Info."
    }

    fn input_format(&self) -> &str {
        LintInput::FORMAT
    }

    async fn execute(&self, input: &str) -> Result<ToolResult, ToolError> {
        let input: LintInput = match input.parse() {
            Ok(parsed) => parsed,
            Err(e) => return Ok(ToolResult::failure(format!("Failed to parse input: {e}"))),
        };

        let path = resolve_user_path(self.root.as_deref(), &input.path);
        if !path.is_file() {
            return Ok(ToolResult::failure(format!(
                "File not found: {}. Check the path and try again.",
                input.path
            )));
        }

        debug!(path = %path.display(), program = %self.program, "Running linter");
        let run = Command::new(&self.program)
            .arg(&path)
            .arg("-rn")
            .arg("--score=n")
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, run).await {
            Err(_) => {
                return Err(ToolError::Timeout {
                    tool_name: "lint_file".into(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
            Ok(Err(e)) => {
                warn!(program = %self.program, error = %e, "Linter could not be started");
                return Ok(ToolResult::failure(format!(
                    "Failed to run {}: {e}",
                    self.program
                )));
            }
            Ok(Ok(output)) => output,
        };

        // pylint exits non-zero whenever it reports anything.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let findings = parse_pylint_output(&stdout);
        if findings.is_empty() && !output.stderr.is_empty() && !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Ok(ToolResult::failure(format!(
                "Linter failed on {}:\n{}",
                input.path,
                stderr.trim()
            )));
        }

        Ok(ToolResult::ok(summarize(&input.path, &findings)))
    }
}
