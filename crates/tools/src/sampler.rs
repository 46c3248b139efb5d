//! Repository sampler: answer a question from a bounded sample of a
//! checked-out repository.
//!
//! The cheap tier probes a fixed list of conventional files. Only when none
//! of them exist does the sampler walk the tree and let the model pick a
//! handful of files to read, at the cost of one extra completion call.

use gitsage_config::SamplerConfig;
use gitsage_core::error::ProviderError;
use gitsage_core::message::Message;
use gitsage_core::provider::{Provider, ProviderRequest};
use gitsage_core::text::clean_truncate;
use std::path::{Component, Path};
use std::sync::Arc;
use tracing::{debug, info};

use crate::workspace::{read_capped, walk_files_blocking};

pub const EMPTY_REPO_MESSAGE: &str = "Cloned the repo, but it appears to be empty.";

pub const NOTHING_USEFUL_MESSAGE: &str =
    "I looked through the repository but could not find anything useful to answer that question.";

pub const DEFAULT_QUESTION: &str =
    "What does this repository do? Summarize its purpose, main components, and how to run it.";

/// Conventional paths probed first, in order.
pub const KNOWN_PATHS: &[&str] = &[
    "README.md",
    "README.rst",
    "README.txt",
    "README",
    "readme.md",
    "package.json",
    "index.html",
    "src/index.js",
    "src/index.ts",
    "src/main.js",
    "src/main.ts",
    "src/App.js",
    "src/App.jsx",
    "src/App.tsx",
    "frontend/src/App.js",
    "frontend/src/App.tsx",
    "app.py",
    "main.py",
    "manage.py",
    "backend/main.py",
    "backend/app/main.py",
    "server.js",
    "app.js",
    "requirements.txt",
    "pyproject.toml",
    "setup.py",
    "Cargo.toml",
    "src/main.rs",
    "src/lib.rs",
    "go.mod",
    "main.go",
    "pom.xml",
    "build.gradle",
    "Dockerfile",
    "docker-compose.yml",
];

const ANSWER_SYSTEM_PROMPT: &str = "You are a senior software engineer answering questions about a \
code repository. Base your answer only on the excerpts provided and say so when they are not enough.";

const SELECTION_SYSTEM_PROMPT: &str = "You help decide which files of a repository are worth reading. \
Reply with relative file paths only, one per line, and nothing else.";

/// Where the digest's files came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestSource {
    KnownFiles,
    LlmSelected,
}

/// A bounded sample of repository content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDigest {
    pub source: DigestSource,
    /// `(relative path, truncated content)` in read order.
    pub entries: Vec<(String, String)>,
}

impl RepoDigest {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries joined under `### <path>` headers.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(path, content)| format!("### {path}\n```\n{content}\n```"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Two-tier sampler over a repository root.
pub struct RepositorySampler {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    config: SamplerConfig,
}

impl RepositorySampler {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.3,
            max_tokens: None,
            config: SamplerConfig::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_config(mut self, config: SamplerConfig) -> Self {
        self.config = config;
        self
    }

    /// Answer `question` about the repository at `root`.
    ///
    /// Only completion failures are errors; unreadable files are skipped.
    pub async fn answer(&self, root: &Path, question: &str) -> Result<String, ProviderError> {
        let known = self.known_file_digest(root).await;
        if !known.is_empty() {
            info!(files = known.entries.len(), "Answering from known files");
            return self.answer_from(&known, question).await;
        }

        let files = walk_files_blocking(root).await;
        if files.is_empty() {
            info!("Repository is empty");
            return Ok(EMPTY_REPO_MESSAGE.to_string());
        }

        debug!(files = files.len(), "No known files, asking model to pick");
        let prompt = selection_prompt(&files, question, self.config.max_selected_files);
        let reply = self.complete(SELECTION_SYSTEM_PROMPT, prompt).await?;
        let picked = parse_selected_paths(&reply, &files, self.config.max_selected_files);

        let mut entries = Vec::new();
        for path in picked {
            match read_capped(root, &path, self.config.selected_file_chars).await {
                Some(content) => entries.push((path, content)),
                None => debug!(path = %path, "Skipping unreadable selection"),
            }
        }

        let selected = RepoDigest {
            source: DigestSource::LlmSelected,
            entries,
        };
        if selected.is_empty() {
            return Ok(NOTHING_USEFUL_MESSAGE.to_string());
        }

        info!(files = selected.entries.len(), "Answering from model-selected files");
        self.answer_from(&selected, question).await
    }

    /// Probe [`KNOWN_PATHS`] and read every hit up to the known-file cap.
    pub async fn known_file_digest(&self, root: &Path) -> RepoDigest {
        let mut entries = Vec::new();
        for path in KNOWN_PATHS {
            if let Some(content) = read_capped(root, path, self.config.known_file_chars).await {
                entries.push((path.to_string(), content));
            }
        }
        RepoDigest {
            source: DigestSource::KnownFiles,
            entries,
        }
    }

    async fn answer_from(&self, digest: &RepoDigest, question: &str) -> Result<String, ProviderError> {
        let prompt = format!(
            "Repository excerpts:\n\n{}\n\nQuestion: {question}",
            digest.render()
        );
        let answer = self.complete(ANSWER_SYSTEM_PROMPT, prompt).await?;
        Ok(clean_truncate(&answer, self.config.answer_chars))
    }

    async fn complete(&self, system: &str, user: String) -> Result<String, ProviderError> {
        let request = ProviderRequest::new(
            self.model.clone(),
            vec![Message::system(system), Message::user(user)],
        )
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens);

        let response = self.provider.complete(request).await?;
        Ok(response.message.content)
    }
}

fn selection_prompt(files: &[String], question: &str, max: usize) -> String {
    format!(
        "These are all the files in the repository:\n{}\n\nWhich files (at most {max}) should be read to answer the question below? \
Reply with their relative paths, one per line.\n\nQuestion: {question}",
        files.join("\n")
    )
}

/// Pull up to `max` relative paths out of a free-form model reply.
///
/// Bullets, numbering, backticks, quotes and a leading `./` are stripped.
/// Anything absolute or containing `..` is dropped, as are duplicates.
/// A candidate with whitespace is kept only when it names one of `files`,
/// which keeps prose lines out.
pub fn parse_selected_paths(reply: &str, files: &[String], max: usize) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();

    for line in reply.lines() {
        let mut candidate = line.trim();
        candidate = candidate.trim_start_matches(['-', '*', '•', '+']).trim_start();

        let digits = candidate.chars().take_while(char::is_ascii_digit).count();
        if digits > 0
            && let Some(rest) = candidate[digits..]
                .strip_prefix('.')
                .or_else(|| candidate[digits..].strip_prefix(')'))
        {
            candidate = rest.trim_start();
        }

        let candidate = candidate
            .trim_matches(|c| matches!(c, '`' | '"' | '\''))
            .trim()
            .trim_start_matches("./");

        if candidate.is_empty() {
            continue;
        }
        if candidate.contains(char::is_whitespace) && !files.iter().any(|f| f == candidate) {
            continue;
        }
        let path = Path::new(candidate);
        let contained = path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            continue;
        }
        if !paths.iter().any(|p| p == candidate) {
            paths.push(candidate.to_string());
        }
        if paths.len() == max {
            break;
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitsage_providers::test_helpers::SequentialMockProvider;

    fn sampler(provider: &Arc<SequentialMockProvider>) -> RepositorySampler {
        RepositorySampler::new(provider.clone(), "mock-model")
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let full = root.join(rel);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    #[tokio::test]
    async fn known_readme_is_answered_in_one_call() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "README.md", "A demo app.");
        let provider = Arc::new(SequentialMockProvider::single_text(
            "  This repository is a demo app. It has a README only.  ",
        ));

        let answer = sampler(&provider)
            .answer(dir.path(), "What does this repo do?")
            .await
            .unwrap();

        assert_eq!(answer, "This repository is a demo app. It has a README only.");
        assert_eq!(provider.call_count(), 1);
        let prompt_requests = provider.requests();
        let prompt = &prompt_requests[0].messages[1].content;
        assert!(prompt.contains("### README.md"));
        assert!(prompt.contains("A demo app."));
        assert!(prompt.contains("Question: What does this repo do?"));
    }

    #[tokio::test]
    async fn empty_repo_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
        let provider = Arc::new(SequentialMockProvider::texts(&[]));

        let answer = sampler(&provider).answer(dir.path(), "anything").await.unwrap();
        assert_eq!(answer, EMPTY_REPO_MESSAGE);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn known_files_are_capped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "README.md", &"r".repeat(5000));
        write(dir.path(), "package.json", "{}");
        let provider = Arc::new(SequentialMockProvider::texts(&[]));

        let digest = sampler(&provider).known_file_digest(dir.path()).await;
        assert_eq!(digest.source, DigestSource::KnownFiles);
        assert_eq!(digest.entries.len(), 2);
        assert_eq!(digest.entries[0].0, "README.md");
        assert_eq!(digest.entries[0].1.chars().count(), 2000);
    }

    #[tokio::test]
    async fn unconventional_layout_falls_back_to_model_selection() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "lib/engine/core.py", "class Engine: pass\n");
        write(dir.path(), "lib/engine/util.py", "def helper(): pass\n");
        let provider = Arc::new(SequentialMockProvider::texts(&[
            "1. `lib/engine/core.py`\n- ./missing.py\n- ../../etc/passwd",
            "It defines an Engine class. Nothing else stands out.",
        ]));

        let answer = sampler(&provider)
            .answer(dir.path(), "What is the core type?")
            .await
            .unwrap();

        assert_eq!(answer, "It defines an Engine class. Nothing else stands out.");
        assert_eq!(provider.call_count(), 2);
        let requests = provider.requests();
        assert!(requests[0].messages[1].content.contains("lib/engine/util.py"));
        let answer_prompt = &requests[1].messages[1].content;
        assert!(answer_prompt.contains("### lib/engine/core.py"));
        assert!(!answer_prompt.contains("missing.py"));
    }

    #[tokio::test]
    async fn fallback_with_nothing_readable_returns_fixed_message() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "data/blob.bin", "xyz");
        let provider = Arc::new(SequentialMockProvider::single_text("nothing/here.txt"));

        let answer = sampler(&provider).answer(dir.path(), "q").await.unwrap();
        assert_eq!(answer, NOTHING_USEFUL_MESSAGE);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn fallback_answer_is_truncated_too() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "x/y.py", "pass\n");
        let long = format!("{} Tail without end", "Sentence here. ".repeat(400));
        let provider = Arc::new(SequentialMockProvider::texts(&["x/y.py", &long]));

        let answer = sampler(&provider).answer(dir.path(), "q").await.unwrap();
        assert!(answer.chars().count() <= 4000);
        assert!(answer.ends_with('.'));
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "README.md", "hi");
        let provider = Arc::new(SequentialMockProvider::new(vec![Err(
            ProviderError::Timeout("slow".into()),
        )]));

        let err = sampler(&provider).answer(dir.path(), "q").await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }

    #[test]
    fn selection_parsing_is_lenient() {
        let reply = "Here are the files:\n1. src/app.py\n2) `lib/core.py`\n* \"docs/guide.md\"\n- ./setup.cfg\n- src/app.py\n/etc/passwd\n../secret";
        assert_eq!(
            parse_selected_paths(reply, &[], 5),
            vec!["src/app.py", "lib/core.py", "docs/guide.md", "setup.cfg"]
        );
    }

    #[test]
    fn paths_with_spaces_are_kept_when_they_exist() {
        let files = vec!["docs/User Guide.md".to_string(), "src/app.py".to_string()];
        let reply = "I would read these:\n- `docs/User Guide.md`\n2. src/app.py\nsome other file.md";
        assert_eq!(
            parse_selected_paths(reply, &files, 5),
            vec!["docs/User Guide.md", "src/app.py"]
        );
    }

    #[tokio::test]
    async fn fallback_reads_selected_file_with_space_in_name() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/User Guide.md", "Run it with make.\n");
        let provider = Arc::new(SequentialMockProvider::texts(&[
            "- docs/User Guide.md",
            "Use make.",
        ]));

        let answer = sampler(&provider).answer(dir.path(), "How to run?").await.unwrap();

        assert_eq!(answer, "Use make.");
        let answer_prompt_requests = provider.requests();
        let answer_prompt = &answer_prompt_requests[1].messages[1].content;
        assert!(answer_prompt.contains("### docs/User Guide.md"));
        assert!(answer_prompt.contains("Run it with make."));
    }

    #[test]
    fn selection_parsing_respects_max() {
        let reply = "a.py\nb.py\nc.py\nd.py\ne.py\nf.py\ng.py";
        assert_eq!(parse_selected_paths(reply, &[], 5).len(), 5);
    }

    #[test]
    fn digest_render_uses_path_headers() {
        let digest = RepoDigest {
            source: DigestSource::KnownFiles,
            entries: vec![("README.md".into(), "A demo app.".into())],
        };
        assert_eq!(digest.render(), "### README.md\n```\nA demo app.\n```");
    }
}
