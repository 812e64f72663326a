//! The agent reasoning loop: think, act, observe, answer.

use std::time::Instant;

use async_recursion::async_recursion;
use tracing::{debug, info, warn};
use versecrew_config::{AgentConfig, CrewConfig};
use versecrew_core::{AgentError, Message};
use versecrew_monitor::{MetricsCollector, TaskMetrics};

use crate::parser::{parse_agent_output, parse_delegation, truncate_at_observation, AgentStep};
use crate::prompt::{self, ToolMenu, ASK_QUESTION, DELEGATE_WORK};
use crate::CrewRunner;

pub const DEFAULT_MAX_ITERATIONS: u32 = 15;

/// One kickoff's view of the crew: the rendered config and where metrics go.
pub(crate) struct Execution<'a> {
    pub runner: &'a CrewRunner,
    pub crew: &'a CrewConfig,
    pub collector: &'a dyn MetricsCollector,
}

impl<'a> Execution<'a> {
    fn tool_menu(&self, agent: &AgentConfig, delegation: bool) -> ToolMenu {
        let menu = ToolMenu::new(self.runner.tools.describe(&agent.tools), agent.tools.clone());
        if !delegation {
            return menu;
        }
        let coworkers: Vec<&str> = self
            .crew
            .agents
            .iter()
            .filter(|a| a.id != agent.id)
            .map(|a| a.role.as_str())
            .collect();
        if coworkers.is_empty() {
            return menu;
        }
        menu.with_delegation(&coworkers)
    }

    /// Runs `agent` on `opening` until it produces a final answer.
    #[async_recursion]
    pub async fn run_agent(
        &self,
        agent: &AgentConfig,
        opening: String,
        task_id: &str,
        delegation: bool,
        metrics: &mut TaskMetrics,
    ) -> Result<String, AgentError> {
        let model = self.runner.models.resolve(agent.model.as_deref());
        let system = prompt::system_prompt(agent, &self.tool_menu(agent, delegation));
        let max_iterations = agent.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS).max(1);
        let mut messages = vec![Message::user(opening)];

        info!("║ AGENT: {} ({}) on task {}", agent.role, model.model_name(), task_id);

        for step in 1..=max_iterations {
            let response = model.chat(&system, &messages).await?;
            metrics.iteration_count += 1;
            metrics.input_tokens += response.metrics.input_tokens;
            metrics.output_tokens += response.metrics.output_tokens;

            match parse_agent_output(&response.content) {
                AgentStep::Finish(answer) => {
                    info!("║     ✓ {} answered after {} step(s)", agent.role, step);
                    return Ok(answer);
                }
                AgentStep::Action { tool, input } => {
                    if agent.verbose {
                        info!("║     [{}] {} → {}: {}", step, agent.role, tool, preview(&input));
                    }
                    let observation = self
                        .use_tool(agent, &tool, &input, task_id, delegation, metrics)
                        .await;
                    debug!("║     Observation: {}", preview(&observation));
                    messages.push(Message::assistant(truncate_at_observation(&response.content)));
                    messages.push(Message::user(format!("Observation: {}", observation)));
                }
            }
        }

        warn!("║     {} hit {} iterations, forcing a final answer", agent.role, max_iterations);
        messages.push(Message::user(prompt::FORCE_FINAL_ANSWER));
        let response = model.chat(&system, &messages).await?;
        metrics.iteration_count += 1;
        metrics.input_tokens += response.metrics.input_tokens;
        metrics.output_tokens += response.metrics.output_tokens;

        match parse_agent_output(&response.content) {
            AgentStep::Finish(answer) => Ok(answer),
            AgentStep::Action { .. } => Err(AgentError::MaxIterationsExceeded(agent.id.clone())),
        }
    }

    /// Runs a tool and turns every outcome, including failures, into observation text.
    async fn use_tool(
        &self,
        agent: &AgentConfig,
        tool: &str,
        input: &str,
        task_id: &str,
        delegation: bool,
        metrics: &mut TaskMetrics,
    ) -> String {
        let start = Instant::now();
        metrics.tool_call_count += 1;

        let observation = match tool {
            DELEGATE_WORK | ASK_QUESTION if delegation => {
                self.delegate(agent, tool, input, task_id, metrics).await
            }
            _ if !agent.tools.iter().any(|t| t == tool) => {
                let mut available = agent.tools.clone();
                if delegation {
                    available.push(DELEGATE_WORK.to_string());
                    available.push(ASK_QUESTION.to_string());
                }
                format!(
                    "Tool '{}' is not available. Use one of: {}.",
                    tool,
                    available.join(", ")
                )
            }
            _ => match self.runner.tools.get(tool) {
                Some(t) => match t.call(input).await {
                    Ok(out) if out.trim().is_empty() => "No results found.".to_string(),
                    Ok(out) => out,
                    Err(e) => {
                        warn!("║     Tool {} failed: {}", tool, e);
                        format!("Tool error: {}", e)
                    }
                },
                None => format!("Tool '{}' is not registered.", tool),
            },
        };

        self.collector.record_tool_call(
            task_id,
            tool,
            input,
            &observation,
            start.elapsed().as_millis() as u64,
        );
        observation
    }

    async fn delegate(
        &self,
        agent: &AgentConfig,
        kind: &str,
        input: &str,
        task_id: &str,
        metrics: &mut TaskMetrics,
    ) -> String {
        let Some(request) = parse_delegation(input) else {
            return format!(
                "Invalid input for {}. Use the format: coworker | task | context.",
                kind
            );
        };

        let Some(coworker) = self.crew.find_agent(&request.coworker) else {
            let roles: Vec<&str> = self.crew.agents.iter().map(|a| a.role.as_str()).collect();
            return format!(
                "Coworker '{}' not found. Choose one of: {}.",
                request.coworker,
                roles.join(", ")
            );
        };

        if coworker.id == agent.id {
            return "You cannot delegate to yourself. Pick a different coworker.".to_string();
        }

        info!("║     ↪ {} {} to {}", agent.role, kind, coworker.role);
        let opening = prompt::delegated_prompt(kind, &request.task, &request.context);
        match self.run_agent(coworker, opening, task_id, false, metrics).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("║     Coworker {} failed: {}", coworker.role, e);
                format!("Coworker {} failed: {}", coworker.role, e)
            }
        }
    }
}

fn preview(s: &str) -> String {
    s.chars().take(100).collect()
}
