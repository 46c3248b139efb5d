//! The agent loop: the heart of gitsage.
//!
//! The agent follows a **Thought → Action → Observation** cycle:
//!
//! 1. **Prompt** the model with the tool catalogue, the session history,
//!    the question and the scratchpad of this turn
//! 2. **Parse** the reply into a final answer, an action, or neither
//! 3. **Act**: dispatch the action and record its observation
//! 4. **Repeat** until a final answer or the step ceiling
//!
//! The turn always ends with an answer, which is appended to the session
//! together with the user's message.

pub mod loop_runner;
pub mod parser;
pub mod prompts;
pub mod step;

pub use loop_runner::{AgentLoop, AgentRun, BUDGET_EXHAUSTED_ANSWER, DEFAULT_MAX_STEPS};
pub use parser::{AgentDecision, parse_response};
pub use step::{AgentStep, StepKind};
