//! Repository tools for the gitsage agent.
//!
//! Every tool takes one newline-delimited string, parses it into a typed
//! input, and answers with a [`ToolResult`](gitsage_core::tool::ToolResult).
//! [`build_registry`] assembles the set a request is allowed to use: the
//! remote-write tool needs a GitHub token and the local file tools need a
//! local repository path.

pub mod analyze_repo;
pub mod apply_patch;
pub mod commit_push;
pub mod get_diff;
pub mod input;
pub mod lint;
pub mod list_files;
pub mod read_file;
pub mod sampler;
pub mod suggest_patch;
pub mod update_remote_file;
pub mod workspace;

use gitsage_config::{SamplerConfig, TimeoutConfig};
use gitsage_core::provider::Provider;
use gitsage_core::tool::ToolRegistry;
use gitsage_github::{GitHubClient, RepoCloner};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use analyze_repo::AnalyzeRepositoryTool;
pub use apply_patch::ApplyPatchTool;
pub use commit_push::CommitAndPushTool;
pub use get_diff::GetDiffTool;
pub use lint::LintFileTool;
pub use list_files::ListRepositoryFilesTool;
pub use read_file::ReadFileContentTool;
pub use sampler::RepositorySampler;
pub use suggest_patch::SuggestPatchTool;
pub use update_remote_file::UpdateRemoteFileTool;

/// Everything the tools need from the surrounding application.
#[derive(Clone)]
pub struct ToolContext {
    pub provider: Arc<dyn Provider>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub github: GitHubClient,
    pub sampler: SamplerConfig,
    pub timeouts: TimeoutConfig,
    /// Local checkout the file tools operate on, if any.
    pub local_repo: Option<PathBuf>,
}

/// Build the registry for one request.
pub fn build_registry(ctx: &ToolContext) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    let sampler = RepositorySampler::new(ctx.provider.clone(), ctx.model.clone())
        .with_temperature(ctx.temperature)
        .with_max_tokens(ctx.max_tokens)
        .with_config(ctx.sampler.clone());
    let cloner = RepoCloner::new(
        ctx.github.clone(),
        Duration::from_secs(ctx.timeouts.clone_secs),
    );

    registry.register(Box::new(AnalyzeRepositoryTool::new(
        cloner,
        Arc::new(sampler),
    )));
    registry.register(Box::new(
        LintFileTool::new(Duration::from_secs(ctx.timeouts.lint_secs))
            .with_root(ctx.local_repo.clone()),
    ));
    registry.register(Box::new(
        SuggestPatchTool::new(ctx.provider.clone(), ctx.model.clone())
            .with_temperature(ctx.temperature)
            .with_root(ctx.local_repo.clone()),
    ));
    registry.register(Box::new(ApplyPatchTool));
    registry.register(Box::new(GetDiffTool::new(ctx.local_repo.clone())));
    registry.register(Box::new(CommitAndPushTool::new(Duration::from_secs(
        ctx.timeouts.git_secs,
    ))));

    if ctx.github.has_token() {
        registry.register(Box::new(UpdateRemoteFileTool::new(ctx.github.clone())));
    }

    if let Some(root) = &ctx.local_repo {
        registry.register(Box::new(ListRepositoryFilesTool::new(root.clone())));
        registry.register(Box::new(ReadFileContentTool::new(root.clone())));
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitsage_providers::test_helpers::SequentialMockProvider;

    fn context(token: Option<&str>, local_repo: Option<PathBuf>) -> ToolContext {
        ToolContext {
            provider: Arc::new(SequentialMockProvider::texts(&[])),
            model: "mock-model".into(),
            temperature: 0.3,
            max_tokens: Some(256),
            github: GitHubClient::new(token.map(String::from)),
            sampler: SamplerConfig::default(),
            timeouts: TimeoutConfig::default(),
            local_repo,
        }
    }

    #[test]
    fn base_registry_has_core_tools_in_order() {
        let registry = build_registry(&context(None, None));
        assert_eq!(
            registry.names(),
            vec![
                "analyze_repository",
                "lint_file",
                "suggest_patch",
                "apply_patch",
                "get_diff",
                "commit_and_push",
            ]
        );
    }

    #[test]
    fn token_adds_remote_update() {
        let registry = build_registry(&context(Some("ghp_x"), None));
        assert!(registry.get("update_remote_file").is_some());
        assert!(registry.get("read_file_content").is_none());
    }

    #[test]
    fn local_repo_adds_file_tools() {
        let registry = build_registry(&context(None, Some(PathBuf::from("/tmp"))));
        assert_eq!(registry.len(), 8);
        assert!(registry.get("list_repository_files").is_some());
        assert!(registry.get("read_file_content").is_some());
    }

    #[test]
    fn every_tool_documents_its_input() {
        let registry = build_registry(&context(Some("t"), Some(PathBuf::from("/tmp"))));
        for def in registry.definitions() {
            assert!(!def.description.is_empty(), "{}", def.name);
            assert!(!def.input_format.is_empty(), "{}", def.name);
        }
    }
}
