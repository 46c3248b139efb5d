//! The agent reasoning loop.
//!
//! One call to [`AgentLoop::run`] is one turn: the loop keeps asking the
//! model for either an action or a final answer, dispatches actions through
//! the tool registry, and feeds each observation back until it gets a final
//! answer or runs out of steps. It never returns without an answer.

use chrono::Utc;
use gitsage_core::error::ProviderError;
use gitsage_core::event::{DomainEvent, EventBus};
use gitsage_core::message::{Message, Session};
use gitsage_core::provider::{Provider, ProviderRequest};
use gitsage_core::tool::ToolRegistry;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::parser::{AgentDecision, parse_response};
use crate::prompts::{STOP_SEQUENCE, malformed_observation, step_prompt, system_prompt};
use crate::step::{AgentStep, StepKind};

pub const DEFAULT_MAX_STEPS: u32 = 15;

pub const BUDGET_EXHAUSTED_ANSWER: &str =
    "Agent stopped due to iteration limit or time limit.";

/// The outcome of one turn.
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub answer: String,
    pub steps: Vec<AgentStep>,
    /// The step budget ran out before a final answer.
    pub exhausted: bool,
}

/// Orchestrates model calls and tool dispatch for one turn at a time.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<ToolRegistry>,
    max_steps: u32,
    event_bus: Arc<EventBus>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            tools,
            max_steps: DEFAULT_MAX_STEPS,
            event_bus,
        }
    }

    /// Set the step ceiling. Values below 1 are raised to 1.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Set the max tokens per model response.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Run one turn against `session` and record it there.
    ///
    /// Only errors from the model call itself are returned; tool failures,
    /// malformed responses and empty completions become observations.
    pub async fn run(
        &self,
        session: &mut Session,
        user_message: &str,
    ) -> Result<AgentRun, gitsage_core::Error> {
        let session_id = session.id.to_string();
        info!(
            session_id = %session_id,
            history = session.len(),
            max_steps = self.max_steps,
            "Agent turn starting"
        );

        let system = system_prompt(&self.tools.definitions());
        let mut steps: Vec<AgentStep> = Vec::new();

        for index in 1..=self.max_steps {
            debug!(session_id = %session_id, step = index, "Agent step");

            let mut messages = Vec::with_capacity(session.len() + 2);
            messages.push(Message::system(system.as_str()));
            messages.extend(session.history.iter().cloned());
            messages.push(Message::user(step_prompt(user_message, &steps)));

            let request = ProviderRequest::new(self.model.clone(), messages)
                .with_temperature(self.temperature)
                .with_max_tokens(self.max_tokens)
                .with_stop(vec![STOP_SEQUENCE.to_string()]);

            // A blank completion is a malformed reply, not a transport failure.
            let decision = match self.provider.complete(request).await {
                Ok(response) => {
                    if let Some(usage) = &response.usage {
                        self.event_bus.publish(DomainEvent::ResponseGenerated {
                            session_id: session_id.clone(),
                            model: response.model.clone(),
                            tokens_used: usage.total_tokens,
                            timestamp: Utc::now(),
                        });
                    }
                    parse_response(&response.message.content)
                }
                Err(ProviderError::EmptyCompletion(detail)) => {
                    debug!(session_id = %session_id, %detail, "Empty completion");
                    AgentDecision::Unparseable {
                        raw: String::new(),
                        reason: "empty response".into(),
                    }
                }
                Err(e) => return Err(e.into()),
            };

            match decision {
                AgentDecision::FinalAnswer { thought, answer } => {
                    steps.push(AgentStep {
                        index,
                        thought,
                        kind: StepKind::FinalAnswer {
                            answer: answer.clone(),
                        },
                    });
                    return Ok(self.finish(session, user_message, answer, steps, false));
                }
                AgentDecision::ToolInvocation {
                    thought,
                    tool,
                    input,
                } => {
                    debug!(tool = %tool, "Dispatching action");
                    let start = Instant::now();
                    let observation = self.tools.invoke(&tool, &input).await;
                    let duration_ms = start.elapsed().as_millis() as u64;

                    if !observation.known {
                        warn!(tool = %tool, "Model asked for an unknown tool");
                    }
                    self.event_bus.publish(DomainEvent::ToolExecuted {
                        tool_name: tool.clone(),
                        success: observation.success,
                        duration_ms,
                        timestamp: Utc::now(),
                    });

                    steps.push(AgentStep {
                        index,
                        thought,
                        kind: StepKind::Action {
                            tool,
                            input,
                            observation: observation.text,
                        },
                    });
                }
                AgentDecision::Unparseable { raw, reason } => {
                    warn!(session_id = %session_id, step = index, %reason, "Unparseable model response");
                    self.event_bus.publish(DomainEvent::ResponseUnparseable {
                        session_id: session_id.clone(),
                        step: index,
                        timestamp: Utc::now(),
                    });
                    steps.push(AgentStep {
                        index,
                        thought: String::new(),
                        kind: StepKind::Malformed {
                            raw,
                            observation: malformed_observation(&reason),
                        },
                    });
                }
            }
        }

        warn!(session_id = %session_id, steps = self.max_steps, "Step budget exhausted");
        self.event_bus.publish(DomainEvent::StepBudgetExhausted {
            session_id,
            steps: self.max_steps,
            timestamp: Utc::now(),
        });
        Ok(self.finish(
            session,
            user_message,
            BUDGET_EXHAUSTED_ANSWER.to_string(),
            steps,
            true,
        ))
    }

    fn finish(
        &self,
        session: &mut Session,
        user_message: &str,
        answer: String,
        steps: Vec<AgentStep>,
        exhausted: bool,
    ) -> AgentRun {
        session.record_turn(user_message, &answer);
        self.event_bus.publish(DomainEvent::TurnCompleted {
            session_id: session.id.to_string(),
            steps: steps.len() as u32,
            timestamp: Utc::now(),
        });
        info!(session_id = %session.id, steps = steps.len(), exhausted, "Agent turn complete");

        AgentRun {
            answer,
            steps,
            exhausted,
        }
    }
}
