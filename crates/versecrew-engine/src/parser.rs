//! Parsing of agent replies into actions or final answers.

const FINAL_ANSWER: &str = "Final Answer:";
const ACTION: &str = "Action:";
const ACTION_INPUT: &str = "Action Input:";
const OBSERVATION: &str = "Observation:";

/// What the agent decided to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStep {
    /// Invoke `tool` with `input`, then continue.
    Action { tool: String, input: String },
    /// Stop with this answer.
    Finish(String),
}

/// Interprets one LLM reply.
///
/// `Final Answer:` wins over an action. A reply with neither marker is taken
/// as the final answer verbatim.
pub fn parse_agent_output(text: &str) -> AgentStep {
    if let Some(idx) = text.find(FINAL_ANSWER) {
        return AgentStep::Finish(text[idx + FINAL_ANSWER.len()..].trim().to_string());
    }

    let action = text.find(ACTION);
    let action_input = text.find(ACTION_INPUT);
    if let (Some(a), Some(i)) = (action, action_input) {
        if a < i {
            let tool = text[a + ACTION.len()..i]
                .lines()
                .next()
                .unwrap_or_default();
            let mut input = &text[i + ACTION_INPUT.len()..];
            if let Some(obs) = input.find(OBSERVATION) {
                input = &input[..obs];
            }
            return AgentStep::Action {
                tool: clean(tool).to_string(),
                input: clean(input).to_string(),
            };
        }
    }

    AgentStep::Finish(text.trim().to_string())
}

/// Drops anything the model invented after its action (a made-up observation).
pub fn truncate_at_observation(text: &str) -> &str {
    match text.find(OBSERVATION) {
        Some(idx) => text[..idx].trim_end(),
        None => text.trim_end(),
    }
}

fn clean(s: &str) -> &str {
    s.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '[' | ']'))
        .trim()
}

/// A `coworker | task | context` delegation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationRequest {
    pub coworker: String,
    pub task: String,
    pub context: String,
}

pub fn parse_delegation(input: &str) -> Option<DelegationRequest> {
    let mut parts = input.splitn(3, '|').map(str::trim);
    let coworker = parts.next().filter(|s| !s.is_empty())?;
    let task = parts.next().filter(|s| !s.is_empty())?;
    let context = parts.next().unwrap_or_default();
    Some(DelegationRequest {
        coworker: coworker.to_string(),
        task: task.to_string(),
        context: context.to_string(),
    })
}
