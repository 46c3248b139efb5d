//! End-to-end tests for the gitsage agent pipeline.
//!
//! These wire the real tool registry, repository sampler and agent loop
//! together against a scripted model and a mock GitHub, and check what the
//! model gets to see at each step.

use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::Arc;

use gitsage_agent::{AgentLoop, AgentRun, BUDGET_EXHAUSTED_ANSWER, StepKind};
use gitsage_config::{SamplerConfig, TimeoutConfig};
use gitsage_core::event::EventBus;
use gitsage_core::message::{Session, SessionId};
use gitsage_github::GitHubClient;
use gitsage_providers::test_helpers::SequentialMockProvider;
use gitsage_tools::{ToolContext, build_registry};

// ── Fixtures ─────────────────────────────────────────────────────────────

fn archive(files: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        zip.start_file(*name, zip::write::FileOptions::default())
            .unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

async fn serve_archive(server: &mut mockito::Server, files: &[(&str, &str)]) {
    server
        .mock("GET", "/octo/demo/archive/refs/heads/main.zip")
        .with_status(200)
        .with_body(archive(files))
        .create_async()
        .await;
}

struct Harness {
    provider: Arc<SequentialMockProvider>,
    agent: AgentLoop,
}

fn harness(
    replies: &[&str],
    web_url: Option<String>,
    local_repo: Option<PathBuf>,
    max_steps: u32,
) -> Harness {
    let provider = Arc::new(SequentialMockProvider::texts(replies));
    let mut github = GitHubClient::new(None);
    if let Some(url) = web_url {
        github = github.with_web_url(url);
    }

    let tools = build_registry(&ToolContext {
        provider: provider.clone(),
        model: "mock-model".into(),
        temperature: 0.3,
        max_tokens: Some(256),
        github,
        sampler: SamplerConfig::default(),
        timeouts: TimeoutConfig::default(),
        local_repo,
    });
    let agent = AgentLoop::new(
        provider.clone(),
        "mock-model",
        0.3,
        Arc::new(tools),
        Arc::new(EventBus::default()),
    )
    .with_max_steps(max_steps);

    Harness { provider, agent }
}

async fn ask(h: &Harness, question: &str) -> (AgentRun, Session) {
    let mut session = Session::new(SessionId::from("e2e"));
    let run = h.agent.run(&mut session, question).await.unwrap();
    (run, session)
}

fn observation(run: &AgentRun, step: usize) -> &str {
    match &run.steps[step].kind {
        StepKind::Action { observation, .. } => observation,
        StepKind::Malformed { observation, .. } => observation,
        StepKind::FinalAnswer { .. } => panic!("step {step} is a final answer"),
    }
}

// ── Repository analysis ──────────────────────────────────────────────────

#[tokio::test]
async fn e2e_analyze_answers_from_readme() {
    let mut server = mockito::Server::new_async().await;
    serve_archive(
        &mut server,
        &[("demo-main/README.md", "# Demo\nA tiny calculator.\n")],
    )
    .await;

    let h = harness(
        &[
            "Thought: I should look at the repo.\nAction: analyze_repository\nAction Input: https://github.com/octo/demo",
            "The repository is a tiny calculator.",
            "Thought: I now know the final answer\nFinal Answer: It is a tiny calculator.",
        ],
        Some(server.url()),
        None,
        15,
    );

    let (run, session) = ask(&h, "What does this repo do?\n\nRepository: https://github.com/octo/demo").await;

    assert_eq!(run.answer, "It is a tiny calculator.");
    assert_eq!(observation(&run, 0), "The repository is a tiny calculator.");
    assert_eq!(h.provider.call_count(), 3);

    let sampler_prompt = &h.provider.requests()[1].messages[1].content;
    assert!(sampler_prompt.contains("### README.md"));
    assert!(sampler_prompt.contains("A tiny calculator."));

    assert_eq!(session.len(), 2);
    assert_eq!(session.history[1].content, "It is a tiny calculator.");
}

#[tokio::test]
async fn e2e_analyze_falls_back_to_model_selected_files() {
    let mut server = mockito::Server::new_async().await;
    serve_archive(
        &mut server,
        &[
            ("demo-main/lib/core.py", "def solve():\n    return 42\n"),
            ("demo-main/lib/util.py", "PI = 3.14\n"),
        ],
    )
    .await;

    let h = harness(
        &[
            "Action: analyze_repository\nAction Input: https://github.com/octo/demo\nWhat does solve return?",
            "- `lib/core.py`",
            "solve() returns 42.",
            "Final Answer: It returns 42.",
        ],
        Some(server.url()),
        None,
        15,
    );

    let (run, _) = ask(&h, "What does solve return?").await;

    assert_eq!(run.answer, "It returns 42.");
    assert_eq!(observation(&run, 0), "solve() returns 42.");

    let requests = h.provider.requests();
    assert_eq!(requests.len(), 4);
    let listing = &requests[1].messages[1].content;
    assert!(listing.contains("lib/core.py\nlib/util.py"));
    let answer_prompt = &requests[2].messages[1].content;
    assert!(answer_prompt.contains("return 42"));
    assert!(!answer_prompt.contains("PI = 3.14"));
}

#[tokio::test]
async fn e2e_empty_repository_needs_no_sampler_call() {
    let mut server = mockito::Server::new_async().await;
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.add_directory("demo-main/", zip::write::FileOptions::default())
        .unwrap();
    let bytes = zip.finish().unwrap().into_inner();
    server
        .mock("GET", "/octo/demo/archive/refs/heads/main.zip")
        .with_status(200)
        .with_body(bytes)
        .create_async()
        .await;

    let h = harness(
        &[
            "Action: analyze_repository\nAction Input: https://github.com/octo/demo",
            "Final Answer: The repository is empty.",
        ],
        Some(server.url()),
        None,
        15,
    );

    let (run, _) = ask(&h, "Summarize").await;
    assert_eq!(
        observation(&run, 0),
        "Cloned the repo, but it appears to be empty."
    );
    assert_eq!(h.provider.call_count(), 2);
}

// ── Tool failures surface as observations ────────────────────────────────

#[tokio::test]
async fn e2e_lint_missing_file_is_recoverable() {
    let h = harness(
        &[
            "Action: lint_file\nAction Input: /definitely/missing.py",
            "Final Answer: That file does not exist.",
        ],
        None,
        None,
        15,
    );

    let (run, _) = ask(&h, "Lint missing.py").await;

    assert_eq!(run.answer, "That file does not exist.");
    assert_eq!(
        observation(&run, 0),
        "File not found: /definitely/missing.py. Check the path and try again."
    );
    let retry = &h.provider.requests()[1];
    assert!(
        retry.messages.last().unwrap().content.contains(
            "Observation: File not found: /definitely/missing.py. Check the path and try again."
        )
    );
}

#[tokio::test]
async fn e2e_apply_patch_without_diff_is_reported() {
    let h = harness(
        &[
            "Action: apply_patch\nAction Input: /tmp/some-repo",
            "Final Answer: I could not apply the patch.",
        ],
        None,
        None,
        15,
    );

    let (run, _) = ask(&h, "Apply the fix").await;
    assert!(observation(&run, 0).starts_with("Failed to apply patch: missing unified diff"));
    assert_eq!(run.answer, "I could not apply the patch.");
}

#[tokio::test]
async fn e2e_unknown_tool_exhausts_budget() {
    let h = harness(
        &[
            "Action: deploy\nAction Input: prod",
            "Action: deploy\nAction Input: prod",
            "Action: deploy\nAction Input: prod",
        ],
        None,
        None,
        3,
    );

    let (run, session) = ask(&h, "Ship it").await;

    assert!(run.exhausted);
    assert_eq!(run.answer, BUDGET_EXHAUSTED_ANSWER);
    assert_eq!(run.steps.len(), 3);
    for i in 0..3 {
        assert!(observation(&run, i).starts_with("Unknown tool 'deploy'. Valid tools are: analyze_repository"));
    }
    assert_eq!(session.history[1].content, BUDGET_EXHAUSTED_ANSWER);
}

// ── Local repository tools ───────────────────────────────────────────────

#[tokio::test]
async fn e2e_local_repository_read_then_diff() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("calc.py"), "def add(a, b):\n    return a - b\n").unwrap();

    let h = harness(
        &[
            "Action: read_file_content\nAction Input: calc.py",
            "Action: get_diff\nAction Input: calc.py\ndef add(a, b):\n    return a + b",
            "Final Answer: add() subtracts; the diff fixes it.",
        ],
        None,
        Some(dir.path().to_path_buf()),
        15,
    );

    let (run, _) = ask(&h, "Is add() correct?").await;

    assert_eq!(observation(&run, 0), "def add(a, b):\n    return a - b\n");
    let diff = observation(&run, 1);
    assert!(diff.starts_with("--- a/calc.py\n+++ b/calc.py\n"));
    assert!(diff.contains("-    return a - b\n+    return a + b\n"));
    // Proposals are never written by get_diff.
    let on_disk = std::fs::read_to_string(dir.path().join("calc.py")).unwrap();
    assert!(on_disk.contains("a - b"));
}
