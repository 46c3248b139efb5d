//! HTTP API gateway for gitsage.
//!
//! Exposes the query endpoint that drives the agent loop, a read-only view
//! of session history, and thin GitHub pass-through routes.
//!
//! Built on Axum. Every request gets its own tool registry (the GitHub token
//! may differ per request); the provider, session store and event bus are
//! shared.

pub mod github_routes;
pub mod query;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    http::{Method, header},
    response::Json,
    routing::{get, post},
};
use gitsage_agent::AgentLoop;
use gitsage_config::AppConfig;
use gitsage_core::event::{DomainEvent, EventBus};
use gitsage_core::provider::Provider;
use gitsage_core::tool::ToolRegistry;
use gitsage_github::GitHubClient;
use gitsage_memory::InMemorySessionStore;
use gitsage_providers::OpenAiCompatProvider;
use gitsage_tools::ToolContext;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub provider: Arc<dyn Provider>,
    pub sessions: InMemorySessionStore,
    pub event_bus: Arc<EventBus>,
    /// Local checkout exposed to the file tools, if any.
    pub local_repo: Option<PathBuf>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(config: AppConfig, provider: Arc<dyn Provider>) -> Self {
        Self {
            config,
            provider,
            sessions: InMemorySessionStore::new(),
            event_bus: Arc::new(EventBus::default()),
            local_repo: None,
        }
    }

    pub fn with_local_repo(mut self, local_repo: Option<PathBuf>) -> Self {
        self.local_repo = local_repo;
        self
    }

    /// A GitHub client using the caller's token if given, else the configured one.
    pub(crate) fn github_client(&self, request_token: Option<&str>) -> GitHubClient {
        let token = request_token
            .filter(|t| !t.trim().is_empty())
            .map(String::from)
            .or_else(|| self.config.github.token.clone());
        GitHubClient::new(token)
            .with_api_url(self.config.github.api_url.clone())
            .with_web_url(self.config.github.web_url.clone())
    }

    pub(crate) fn tool_context(&self, github: GitHubClient) -> ToolContext {
        ToolContext {
            provider: self.provider.clone(),
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: Some(self.config.max_tokens),
            github,
            sampler: self.config.sampler.clone(),
            timeouts: self.config.timeouts.clone(),
            local_repo: self.local_repo.clone(),
        }
    }

    pub(crate) fn agent(&self, tools: ToolRegistry) -> AgentLoop {
        AgentLoop::new(
            self.provider.clone(),
            self.config.model.clone(),
            self.config.temperature,
            Arc::new(tools),
            self.event_bus.clone(),
        )
        .with_max_steps(self.config.agent.max_steps)
        .with_max_tokens(Some(self.config.max_tokens))
    }
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .route("/query-repo", post(query::query_repo))
        .route("/sessions/{id}", get(query::get_session))
        .route("/github/info", get(github_routes::repo_info))
        .route("/github/branches", get(github_routes::branches))
        .route("/github/files", get(github_routes::files))
        .route("/github/pr", post(github_routes::create_pr))
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(
    config: AppConfig,
    local_repo: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    if !config.has_api_key() {
        warn!("No chat API key configured; set GITSAGE_API_KEY or GITHUB_API_TOKEN");
    }
    let provider = Arc::new(
        OpenAiCompatProvider::new(
            "github-models",
            config.api_url.clone(),
            config.api_key.clone().unwrap_or_default(),
        )
        .with_timeout(Duration::from_secs(config.timeouts.model_secs)),
    );

    let state = Arc::new(GatewayState::new(config, provider).with_local_repo(local_repo));
    spawn_event_logger(state.event_bus.subscribe());

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Drain domain events into the debug log.
fn spawn_event_logger(mut events: broadcast::Receiver<Arc<DomainEvent>>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!(event = ?event, "Domain event"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down gateway");
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use gitsage_providers::test_helpers::SequentialMockProvider;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    pub fn state_with(provider: Arc<SequentialMockProvider>, config: AppConfig) -> SharedState {
        Arc::new(GatewayState::new(config, provider))
    }

    pub fn state(provider: Arc<SequentialMockProvider>) -> SharedState {
        state_with(provider, AppConfig::default())
    }

    pub async fn send(
        state: SharedState,
        request: Request<Body>,
    ) -> (StatusCode, serde_json::Value) {
        let response = build_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::test_support::get;
    use super::*;
    use axum::http::StatusCode;
    use gitsage_providers::test_helpers::SequentialMockProvider;

    #[tokio::test]
    async fn health_endpoint() {
        let (status, body) = send(
            state(Arc::new(SequentialMockProvider::texts(&[]))),
            get("/health"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn request_token_overrides_configured_token() {
        let mut config = AppConfig::default();
        config.github.token = Some("ghp_config".into());
        let state = GatewayState::new(config, Arc::new(SequentialMockProvider::texts(&[])));

        assert_eq!(state.github_client(Some("ghp_req")).token(), Some("ghp_req"));
        assert_eq!(state.github_client(Some("  ")).token(), Some("ghp_config"));
        assert_eq!(state.github_client(None).token(), Some("ghp_config"));
    }

    #[test]
    fn agent_uses_configured_step_ceiling() {
        let mut config = AppConfig::default();
        config.agent.max_steps = 4;
        let state = GatewayState::new(config, Arc::new(SequentialMockProvider::texts(&[])));
        assert_eq!(state.agent(ToolRegistry::new()).max_steps(), 4);
    }
}
