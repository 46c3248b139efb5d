//! `gitsage gateway`: start the HTTP API server.

use std::path::PathBuf;

pub async fn run(
    port: Option<u16>,
    host: Option<String>,
    local: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;
    if let Some(port) = port {
        config.gateway.port = port;
    }
    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(dir) = &local
        && !dir.is_dir()
    {
        return Err(format!("Local repository {} is not a directory", dir.display()).into());
    }

    println!("gitsage gateway");
    println!("  Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("  Model:     {}", config.model);
    if let Some(dir) = &local {
        println!("  Local:     {}", dir.display());
    }

    gitsage_gateway::start(config, local).await
}
