//! Typed tool inputs.
//!
//! On the wire every tool takes one string; multi-field tools put each
//! field on its own line and let the last field run to the end of the
//! input. Each tool parses that string into one of these structs before
//! doing any work, so a missing field is caught at the boundary.

use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolInputError {
    #[error("missing {field}; expected `{format}`")]
    Missing {
        field: &'static str,
        format: &'static str,
    },

    #[error("{field} is empty; expected `{format}`")]
    Empty {
        field: &'static str,
        format: &'static str,
    },
}

/// Cursor over newline-delimited fields.
struct Fields<'a> {
    rest: &'a str,
    format: &'static str,
}

impl<'a> Fields<'a> {
    fn new(input: &'a str, format: &'static str) -> Self {
        Self {
            rest: input.trim(),
            format,
        }
    }

    /// The next single-line field.
    fn line(&mut self, field: &'static str) -> Result<String, ToolInputError> {
        if self.rest.is_empty() {
            return Err(ToolInputError::Missing {
                field,
                format: self.format,
            });
        }
        let (head, tail) = self.rest.split_once('\n').unwrap_or((self.rest, ""));
        self.rest = tail;
        let head = head.trim();
        if head.is_empty() {
            return Err(ToolInputError::Empty {
                field,
                format: self.format,
            });
        }
        Ok(head.to_string())
    }

    /// Everything that is left, possibly spanning many lines.
    fn remainder(&mut self, field: &'static str) -> Result<String, ToolInputError> {
        let rest = std::mem::take(&mut self.rest);
        if rest.trim().is_empty() {
            return Err(ToolInputError::Missing {
                field,
                format: self.format,
            });
        }
        Ok(rest.to_string())
    }

    fn optional_remainder(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.rest).trim();
        (!rest.is_empty()).then(|| rest.to_string())
    }
}

/// `analyze_repository`: `<repo_url>[\n<question>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeInput {
    pub repo_url: String,
    pub question: Option<String>,
}

impl AnalyzeInput {
    pub const FORMAT: &'static str = "<repo_url>\\n<optional question>";
}

impl FromStr for AnalyzeInput {
    type Err = ToolInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = Fields::new(s, Self::FORMAT);
        Ok(Self {
            repo_url: fields.line("repo_url")?,
            question: fields.optional_remainder(),
        })
    }
}

/// `lint_file`: `<path>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintInput {
    pub path: String,
}

impl LintInput {
    pub const FORMAT: &'static str = "<path>";
}

impl FromStr for LintInput {
    type Err = ToolInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = Fields::new(s, Self::FORMAT);
        Ok(Self {
            path: fields.line("path")?,
        })
    }
}

/// `suggest_patch`: `<path>\n<instructions>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestPatchInput {
    pub path: String,
    pub instructions: String,
}

impl SuggestPatchInput {
    pub const FORMAT: &'static str = "<path>\\n<instructions>";
}

impl FromStr for SuggestPatchInput {
    type Err = ToolInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = Fields::new(s, Self::FORMAT);
        Ok(Self {
            path: fields.line("path")?,
            instructions: fields.remainder("instructions")?.trim().to_string(),
        })
    }
}

/// `apply_patch`: `<repo_path>\n<unified diff>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyPatchInput {
    pub repo_path: String,
    pub diff: String,
}

impl ApplyPatchInput {
    pub const FORMAT: &'static str = "<repo_path>\\n<unified diff>";
}

impl FromStr for ApplyPatchInput {
    type Err = ToolInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = Fields::new(s, Self::FORMAT);
        Ok(Self {
            repo_path: fields.line("repo_path")?,
            diff: fields.remainder("unified diff")?,
        })
    }
}

/// `get_diff`: `<path>\n<proposed content>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetDiffInput {
    pub path: String,
    pub proposed: String,
}

impl GetDiffInput {
    pub const FORMAT: &'static str = "<path>\\n<proposed content>";
}

impl FromStr for GetDiffInput {
    type Err = ToolInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = Fields::new(s, Self::FORMAT);
        Ok(Self {
            path: fields.line("path")?,
            proposed: fields.remainder("proposed content")?,
        })
    }
}

/// `commit_and_push`: `<repo_path>\n<message>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPushInput {
    pub repo_path: String,
    pub message: String,
}

impl CommitPushInput {
    pub const FORMAT: &'static str = "<repo_path>\\n<commit message>";
}

impl FromStr for CommitPushInput {
    type Err = ToolInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = Fields::new(s, Self::FORMAT);
        Ok(Self {
            repo_path: fields.line("repo_path")?,
            message: fields.remainder("commit message")?.trim().to_string(),
        })
    }
}

/// `update_remote_file`: `<repo_url>\n<path>\n<message>\n<content>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRemoteInput {
    pub repo_url: String,
    pub path: String,
    pub message: String,
    pub content: String,
}

impl UpdateRemoteInput {
    pub const FORMAT: &'static str = "<repo_url>\\n<path>\\n<commit message>\\n<new content>";
}

impl FromStr for UpdateRemoteInput {
    type Err = ToolInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = Fields::new(s, Self::FORMAT);
        Ok(Self {
            repo_url: fields.line("repo_url")?,
            path: fields.line("path")?,
            message: fields.line("commit message")?,
            content: fields.remainder("new content")?,
        })
    }
}

/// `list_repository_files`: `[<subdir>]`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListFilesInput {
    pub subdir: Option<String>,
}

impl FromStr for ListFilesInput {
    type Err = ToolInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let subdir = s.trim().trim_start_matches("./").trim_end_matches('/');
        Ok(Self {
            subdir: (!subdir.is_empty() && subdir != ".").then(|| subdir.to_string()),
        })
    }
}

/// `read_file_content`: `<relative path>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadFileInput {
    pub path: String,
}

impl ReadFileInput {
    pub const FORMAT: &'static str = "<relative path>";
}

impl FromStr for ReadFileInput {
    type Err = ToolInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = Fields::new(s, Self::FORMAT);
        Ok(Self {
            path: fields.line("path")?,
        })
    }
}
