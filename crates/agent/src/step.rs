use serde::{Deserialize, Serialize};

/// One model call of a turn and what came of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStep {
    /// 1-based position within the turn.
    pub index: u32,
    pub thought: String,
    pub kind: StepKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    Action {
        tool: String,
        input: String,
        observation: String,
    },
    /// The response did not follow the grammar.
    Malformed { raw: String, observation: String },
    FinalAnswer { answer: String },
}

impl AgentStep {
    /// This step as the model should see it on the next call.
    pub fn scratchpad(&self) -> String {
        match &self.kind {
            StepKind::Action {
                tool,
                input,
                observation,
            } => format!(
                "Thought: {}\nAction: {tool}\nAction Input: {input}\nObservation: {observation}\n",
                self.thought
            ),
            StepKind::Malformed { raw, observation } => {
                format!("{raw}\nObservation: {observation}\n")
            }
            StepKind::FinalAnswer { answer } => {
                format!("Thought: {}\nFinal Answer: {answer}\n", self.thought)
            }
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self.kind, StepKind::Malformed { .. })
    }
}
