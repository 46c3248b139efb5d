//! Parse one model response into the next thing the loop should do.
//!
//! The grammar is the classic ReAct text format:
//!
//! ```text
//! Thought: ...
//! Action: <tool name>
//! Action Input: <text, may span lines>
//! ```
//!
//! or
//!
//! ```text
//! Thought: ...
//! Final Answer: <text>
//! ```

use regex_lite::Regex;
use std::sync::LazyLock;

static ACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
        .expect("action pattern is valid")
});

static ACTION_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Action\s*\d*\s*:").expect("action marker pattern is valid"));

static FINAL_ANSWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Final Answer\s*:(.*)").expect("final answer pattern is valid"));

/// Where a hallucinated observation starts.
static OBSERVATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*Observation\s*:").expect("observation pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentDecision {
    FinalAnswer { thought: String, answer: String },
    ToolInvocation {
        thought: String,
        tool: String,
        input: String,
    },
    Unparseable { raw: String, reason: String },
}

fn unparseable(raw: &str, reason: &str) -> AgentDecision {
    AgentDecision::Unparseable {
        raw: raw.trim().to_string(),
        reason: reason.to_string(),
    }
}

/// Text before `end`, minus a leading `Thought:` label.
fn thought_before(text: &str, end: usize) -> String {
    let head = text[..end].trim();
    head.strip_prefix("Thought:").unwrap_or(head).trim().to_string()
}

/// Trim and drop one pair of surrounding quotes.
fn clean_action_input(raw: &str) -> String {
    let trimmed = raw.trim();
    for quote in ['"', '\'', '`'] {
        if trimmed.len() >= 2
            && let Some(inner) = trimmed
                .strip_prefix(quote)
                .and_then(|s| s.strip_suffix(quote))
        {
            return inner.to_string();
        }
    }
    trimmed.to_string()
}

pub fn parse_response(text: &str) -> AgentDecision {
    let action = ACTION.captures(text);
    let final_answer = FINAL_ANSWER.captures(text);

    match (action, final_answer) {
        (Some(_), Some(_)) => unparseable(
            text,
            "the response contains both an action and a final answer",
        ),
        (Some(caps), None) => {
            let Some(whole) = caps.get(0) else {
                return unparseable(text, "no action found");
            };
            let tool = caps[1]
                .lines()
                .next()
                .unwrap_or_default()
                .trim()
                .trim_matches(|c| matches!(c, '`' | '[' | ']' | '"' | '\''))
                .trim()
                .to_string();
            if tool.is_empty() {
                return unparseable(text, "`Action:` does not name a tool");
            }

            let mut input = &caps[2];
            if let Some(obs) = OBSERVATION.find(input) {
                input = &input[..obs.start()];
            }

            AgentDecision::ToolInvocation {
                thought: thought_before(text, whole.start()),
                tool,
                input: clean_action_input(input),
            }
        }
        (None, Some(caps)) => {
            let answer = caps[1].trim();
            if answer.is_empty() {
                return unparseable(text, "the final answer is empty");
            }
            let start = caps.get(0).map_or(0, |m| m.start());
            AgentDecision::FinalAnswer {
                thought: thought_before(text, start),
                answer: answer.to_string(),
            }
        }
        (None, None) if ACTION_ONLY.is_match(text) => {
            unparseable(text, "`Action:` is not followed by `Action Input:`")
        }
        (None, None) => unparseable(text, "no `Action:` or `Final Answer:` found"),
    }
}
