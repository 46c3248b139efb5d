//! `gitsage ask`: one question, or an interactive session on stdin.

use gitsage_agent::AgentLoop;
use gitsage_config::AppConfig;
use gitsage_core::event::EventBus;
use gitsage_core::message::{Session, SessionId};
use gitsage_github::GitHubClient;
use gitsage_providers::OpenAiCompatProvider;
use gitsage_tools::{ToolContext, build_registry};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

fn build_agent(config: &AppConfig, local: Option<PathBuf>) -> AgentLoop {
    let provider = Arc::new(
        OpenAiCompatProvider::new(
            "github-models",
            config.api_url.clone(),
            config.api_key.clone().unwrap_or_default(),
        )
        .with_timeout(Duration::from_secs(config.timeouts.model_secs)),
    );
    let github = GitHubClient::new(config.github.token.clone())
        .with_api_url(config.github.api_url.clone())
        .with_web_url(config.github.web_url.clone());

    let tools = build_registry(&ToolContext {
        provider: provider.clone(),
        model: config.model.clone(),
        temperature: config.temperature,
        max_tokens: Some(config.max_tokens),
        github,
        sampler: config.sampler.clone(),
        timeouts: config.timeouts.clone(),
        local_repo: local,
    });

    AgentLoop::new(
        provider,
        config.model.clone(),
        config.temperature,
        Arc::new(tools),
        Arc::new(EventBus::default()),
    )
    .with_max_steps(config.agent.max_steps)
    .with_max_tokens(Some(config.max_tokens))
}

fn agent_input(question: &str, repo_url: Option<&str>) -> String {
    match repo_url {
        Some(url) => gitsage_gateway::query::agent_input(question, url),
        None => question.to_string(),
    }
}

pub async fn run(
    question: Option<String>,
    repo_url: Option<String>,
    local: Option<PathBuf>,
    session_id: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    if !config.has_api_key() {
        eprintln!("No API key configured.");
        eprintln!("Set GITSAGE_API_KEY (or GITHUB_API_TOKEN), or add api_key to:");
        eprintln!("  {}", AppConfig::config_dir().join("config.toml").display());
        return Err("No API key found".into());
    }

    let agent = build_agent(&config, local);
    let mut session = Session::new(SessionId::from(session_id.as_str()));

    if let Some(question) = question {
        let run = agent
            .run(&mut session, &agent_input(&question, repo_url.as_deref()))
            .await?;
        println!("{}", run.answer);
        return Ok(());
    }

    println!("gitsage interactive session ({})", session.id);
    if let Some(url) = &repo_url {
        println!("Repository: {url}");
    }
    println!("Type 'exit' or press Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        match agent
            .run(&mut session, &agent_input(line, repo_url.as_deref()))
            .await
        {
            Ok(run) => {
                for text in run.answer.lines() {
                    println!("gitsage > {text}");
                }
            }
            Err(e) => eprintln!("[error] {e}"),
        }
        println!();
    }

    Ok(())
}
