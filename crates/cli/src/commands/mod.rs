pub mod ask;
pub mod doctor;
pub mod gateway;
pub mod init;

use gitsage_config::AppConfig;

pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}
