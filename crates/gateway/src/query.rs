//! `POST /query-repo` and `GET /sessions/{id}`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use gitsage_core::error::SessionError;
use gitsage_core::message::{DEFAULT_SESSION_ID, Session};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use crate::SharedState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub repo_url: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
    pub query: String,
    #[serde(default)]
    pub github_token: Option<String>,
}

fn default_session_id() -> String {
    DEFAULT_SESSION_ID.to_string()
}

/// Always sent with status 200; failures carry `error` instead of `response`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum QueryResponse {
    Answer { response: String },
    Failure { error: String },
}

/// The agent's input for one query.
pub fn agent_input(query: &str, repo_url: &str) -> String {
    format!("{query}\n\nRepository: {repo_url}")
}

pub async fn query_repo(
    State(state): State<SharedState>,
    Json(request): Json<QueryRequest>,
) -> Json<QueryResponse> {
    info!(session_id = %request.session_id, repo = %request.repo_url, "Query received");

    let session = match state.sessions.session(&request.session_id).await {
        Ok(session) => session,
        Err(e) => {
            return Json(QueryResponse::Failure {
                error: e.to_string(),
            });
        }
    };

    let github = state.github_client(request.github_token.as_deref());
    let tools = gitsage_tools::build_registry(&state.tool_context(github));
    let agent = state.agent(tools);
    let input = agent_input(&request.query, &request.repo_url);
    let limit = Duration::from_secs(state.config.agent.request_timeout_secs);

    // Held for the whole turn: requests on one session run one at a time.
    let mut session = session.lock().await;
    let outcome = tokio::time::timeout(limit, agent.run(&mut session, &input)).await;

    let response = match outcome {
        Ok(Ok(run)) => QueryResponse::Answer {
            response: run.answer,
        },
        Ok(Err(e)) => {
            error!(session_id = %request.session_id, error = %e, "Agent turn failed");
            QueryResponse::Failure {
                error: e.to_string(),
            }
        }
        Err(_) => {
            error!(session_id = %request.session_id, "Agent turn timed out");
            QueryResponse::Failure {
                error: format!("Request timed out after {}s", limit.as_secs()),
            }
        }
    };
    Json(response)
}

pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, (StatusCode, Json<serde_json::Value>)> {
    match state.sessions.snapshot(&id).await {
        Ok(session) => Ok(Json(session)),
        Err(e @ SessionError::NotFound(_)) => Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": e.to_string() })),
        )),
        Err(e) => Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": e.to_string() })),
        )),
    }
}
