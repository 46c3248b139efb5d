//! `gitsage doctor`: diagnose configuration and external tools.

use gitsage_config::AppConfig;
use tokio::process::Command;

async fn on_path(program: &str) -> Option<String> {
    let output = Command::new(program).arg("--version").output().await.ok()?;
    if !output.status.success() {
        return None;
    }
    let version = String::from_utf8_lossy(&output.stdout);
    Some(version.lines().next().unwrap_or_default().trim().to_string())
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("gitsage doctor");
    println!("==============\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  -  No config file (defaults and environment only); run `gitsage init` to create one");
    }

    match AppConfig::load() {
        Ok(config) => {
            println!("  ok Config valid (model {})", config.model);

            if config.has_api_key() {
                println!("  ok Chat API key configured");
            } else {
                println!("  !! No chat API key; set GITSAGE_API_KEY or GITHUB_API_TOKEN");
                issues += 1;
            }

            if config.github.token.is_some() {
                println!("  ok GitHub token configured");
            } else {
                println!("  -  No GitHub token; remote edits and private clones are disabled");
            }
        }
        Err(e) => {
            println!("  !! Config invalid: {e}");
            issues += 1;
        }
    }

    for program in ["git", "pylint"] {
        match on_path(program).await {
            Some(version) => println!("  ok {program} found ({version})"),
            None => {
                println!("  !! {program} not found on PATH");
                issues += 1;
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
