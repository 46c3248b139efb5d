//! Configuration loading, validation, and management for gitsage.
//!
//! Loads configuration from `~/.gitsage/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.gitsage/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Credential for the chat-completion provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible chat endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model identifier sent with every completion request
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Agent loop configuration
    #[serde(default)]
    pub agent: AgentConfig,

    /// Repository sampler configuration
    #[serde(default)]
    pub sampler: SamplerConfig,

    /// GitHub configuration
    #[serde(default)]
    pub github: GitHubConfig,

    /// Timeouts for external operations
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_api_url() -> String {
    "https://models.github.ai/inference".into()
}
fn default_model() -> String {
    "openai/gpt-4.1-mini".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    256
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("agent", &self.agent)
            .field("sampler", &self.sampler)
            .field("github", &self.github)
            .field("timeouts", &self.timeouts)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model round-trips per request (must be >= 1)
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Wall-clock limit for one whole agent run, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_max_steps() -> u32 {
    15
}
fn default_request_timeout() -> u64 {
    300
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Chars kept from each known entry-point file
    #[serde(default = "default_known_file_chars")]
    pub known_file_chars: usize,

    /// Chars kept from each model-selected file
    #[serde(default = "default_selected_file_chars")]
    pub selected_file_chars: usize,

    /// How many files the model may pick in the fallback pass
    #[serde(default = "default_max_selected_files")]
    pub max_selected_files: usize,

    /// Chars kept from the sampler's final answer
    #[serde(default = "default_answer_chars")]
    pub answer_chars: usize,
}

fn default_known_file_chars() -> usize {
    2000
}
fn default_selected_file_chars() -> usize {
    4000
}
fn default_max_selected_files() -> usize {
    5
}
fn default_answer_chars() -> usize {
    4000
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            known_file_chars: default_known_file_chars(),
            selected_file_chars: default_selected_file_chars(),
            max_selected_files: default_max_selected_files(),
            answer_chars: default_answer_chars(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Bearer token for authenticated GitHub operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// REST API base URL
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Web base URL (archive downloads, clone URLs)
    #[serde(default = "default_github_web_url")]
    pub web_url: String,
}

fn default_github_api_url() -> String {
    "https://api.github.com".into()
}
fn default_github_web_url() -> String {
    "https://github.com".into()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_github_api_url(),
            web_url: default_github_web_url(),
        }
    }
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &redact(&self.token))
            .field("api_url", &self.api_url)
            .field("web_url", &self.web_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_model_timeout")]
    pub model_secs: u64,

    #[serde(default = "default_lint_timeout")]
    pub lint_secs: u64,

    #[serde(default = "default_git_timeout")]
    pub git_secs: u64,

    #[serde(default = "default_clone_timeout")]
    pub clone_secs: u64,
}

fn default_model_timeout() -> u64 {
    30
}
fn default_lint_timeout() -> u64 {
    10
}
fn default_git_timeout() -> u64 {
    60
}
fn default_clone_timeout() -> u64 {
    120
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            model_secs: default_model_timeout(),
            lint_secs: default_lint_timeout(),
            git_secs: default_git_timeout(),
            clone_secs: default_clone_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.gitsage/config.toml).
    ///
    /// Environment overrides:
    /// - `GITSAGE_API_KEY`, then `GITHUB_API_TOKEN`: chat provider credential
    /// - `GITHUB_TOKEN`, then `GITHUB_API_TOKEN`: GitHub bearer credential
    /// - `GITSAGE_MODEL`: model identifier
    /// - `GITSAGE_MAX_STEPS`: agent step budget
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if self.api_key.is_none() {
            self.api_key = lookup("GITSAGE_API_KEY").or_else(|| lookup("GITHUB_API_TOKEN"));
        }

        if self.github.token.is_none() {
            self.github.token = lookup("GITHUB_TOKEN").or_else(|| lookup("GITHUB_API_TOKEN"));
        }

        if let Some(model) = lookup("GITSAGE_MODEL") {
            self.model = model;
        }

        if let Some(steps) = lookup("GITSAGE_MAX_STEPS") {
            self.agent.max_steps = steps.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("GITSAGE_MAX_STEPS is not a number: {steps}"))
            })?;
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".gitsage")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }

        if self.sampler.known_file_chars == 0
            || self.sampler.selected_file_chars == 0
            || self.sampler.answer_chars == 0
        {
            return Err(ConfigError::ValidationError(
                "sampler character caps must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if a provider credential is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            agent: AgentConfig::default(),
            sampler: SamplerConfig::default(),
            github: GitHubConfig::default(),
            timeouts: TimeoutConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.model, "openai/gpt-4.1-mini");
        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.agent.max_steps, 15);
        assert_eq!(config.sampler.known_file_chars, 2000);
        assert_eq!(config.sampler.selected_file_chars, 4000);
        assert_eq!(config.timeouts.model_secs, 30);
        assert_eq!(config.timeouts.lint_secs, 10);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = \"gpt-4o\"\n[agent]\nmax_steps = 4\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.agent.max_steps, 4);
        assert_eq!(config.agent.request_timeout_secs, 300);
        assert_eq!(config.sampler.max_selected_files, 5);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_step_budget_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_steps = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.api_url, "https://models.github.ai/inference");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "temperature = \"hot\"").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_fill_missing_credentials() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("GITHUB_API_TOKEN", "ghp_shared"),
                ("GITSAGE_MODEL", "openai/gpt-4o"),
                ("GITSAGE_MAX_STEPS", "7"),
            ]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("ghp_shared"));
        assert_eq!(config.github.token.as_deref(), Some("ghp_shared"));
        assert_eq!(config.model, "openai/gpt-4o");
        assert_eq!(config.agent.max_steps, 7);
    }

    #[test]
    fn explicit_keys_win_over_fallbacks() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("GITSAGE_API_KEY", "sk-model"),
                ("GITHUB_TOKEN", "ghp_repo"),
                ("GITHUB_API_TOKEN", "ghp_shared"),
            ]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-model"));
        assert_eq!(config.github.token.as_deref(), Some("ghp_repo"));
    }

    #[test]
    fn bad_step_override_is_rejected() {
        let mut config = AppConfig::default();
        assert!(config.apply_env(env(&[("GITSAGE_MAX_STEPS", "lots")])).is_err());
        assert!(config.apply_env(env(&[("GITSAGE_MAX_STEPS", "0")])).is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-secret".into());
        config.github.token = Some("ghp_secret".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(!rendered.contains("ghp_secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("models.github.ai"));
        assert!(toml_str.contains("max_steps = 15"));
    }
}
