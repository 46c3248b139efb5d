//! `gitsage init`: write a default config file.

use gitsage_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or delete it and re-run `gitsage init`.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Created {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set GITSAGE_API_KEY (or GITHUB_API_TOKEN for GitHub Models)");
    println!("  2. Optionally set GITHUB_TOKEN to enable remote edits and private clones");
    println!("  3. Run: gitsage ask --repo-url https://github.com/<owner>/<repo> \"What does this do?\"");
    Ok(())
}
