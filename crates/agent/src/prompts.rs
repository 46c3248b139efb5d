//! Prompt text for the ReAct loop.

use gitsage_core::tool::ToolDefinition;

use crate::step::AgentStep;

pub const PERSONA: &str = "You are a helpful, senior-level code review assistant with full access to \
the project's repo, linter, patch tools, and commit logic.";

const GOALS: &str = "Use the tools available to:
- Analyze the code for issues
- Suggest fixes
- Apply patches safely
- Commit approved changes
Be concise and confident in your responses.";

/// Stop sequence sent with every request so the model hands control back
/// after naming an action.
pub const STOP_SEQUENCE: &str = "\nObservation:";

/// The system message: persona, tool catalogue, grammar, goals.
pub fn system_prompt(tools: &[ToolDefinition]) -> String {
    let mut prompt = format!("{PERSONA}\n\n");

    if tools.is_empty() {
        prompt.push_str("You have no tools available.\n");
    } else {
        prompt.push_str("You have access to the following tools:\n\n");
        for tool in tools {
            prompt.push_str(&format!(
                "{}: {}\n    Input: {}\n",
                tool.name, tool.description, tool.input_format
            ));
        }
    }

    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    prompt.push_str(&format!(
        "\nUse the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{}]
Action Input: the input to the action (\\n means a new line)
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

Never write an Action and a Final Answer in the same response. Never write an \
Observation yourself; it is provided after each action.

{GOALS}",
        names.join(", ")
    ));
    prompt
}

/// The user message for the next step: the question plus everything the
/// model has done so far this turn.
pub fn step_prompt(question: &str, steps: &[AgentStep]) -> String {
    let mut prompt = format!("Question: {question}\n");
    for step in steps {
        prompt.push_str(&step.scratchpad());
    }
    prompt.push_str("Thought:");
    prompt
}

/// Observation fed back after a response that did not follow the grammar.
pub fn malformed_observation(reason: &str) -> String {
    format!(
        "Could not parse your response ({reason}). Follow the prescribed format: either \
`Action: <tool>` followed by `Action Input: <input>`, or `Final Answer: <answer>`, never both."
    )
}
