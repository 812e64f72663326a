//! Crew execution engine for versecrew.
//!
//! A [`CrewRunner`] owns a validated [`CrewConfig`], the tools its agents may
//! call, and the chat models they think with. [`CrewRunner::kickoff`] renders
//! the crew for a verse and runs its tasks in order.

mod agent;
mod parser;
mod prompt;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use versecrew_config::CrewConfig;
use versecrew_core::{AgentError, ChatModel};
use versecrew_monitor::{now_ms, CrewMetrics, MetricsCollector, TaskMetrics};
use versecrew_tools::ToolRegistry;

pub use agent::DEFAULT_MAX_ITERATIONS;
pub use parser::{parse_agent_output, parse_delegation, AgentStep, DelegationRequest};
pub use prompt::{ASK_QUESTION, DELEGATE_WORK};

use agent::Execution;

// ─────────────────────────────────────────────────────────────────────────────
// Model Resolver
// ─────────────────────────────────────────────────────────────────────────────

/// Maps an agent's optional model id to a chat model, falling back to the default.
#[derive(Clone)]
pub struct ModelResolver {
    models: HashMap<String, Arc<dyn ChatModel>>,
    default_model: Arc<dyn ChatModel>,
}

impl ModelResolver {
    pub fn new(default_model: Arc<dyn ChatModel>) -> Self {
        Self { models: HashMap::new(), default_model }
    }

    pub fn with_model(mut self, id: impl Into<String>, model: Arc<dyn ChatModel>) -> Self {
        self.models.insert(id.into(), model);
        self
    }

    pub fn resolve(&self, model_id: Option<&str>) -> &Arc<dyn ChatModel> {
        model_id
            .and_then(|id| self.models.get(id))
            .unwrap_or(&self.default_model)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Crew Runner
// ─────────────────────────────────────────────────────────────────────────────

/// Output of one task, in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutput {
    pub task_id: String,
    pub agent_id: String,
    pub output: String,
}

/// Everything a kickoff produced.
#[derive(Debug, Clone, Serialize)]
pub struct CrewOutput {
    /// Output of the last task.
    pub final_output: String,
    pub task_outputs: Vec<TaskOutput>,
    pub metrics: CrewMetrics,
}

pub struct CrewRunner {
    config: CrewConfig,
    tools: ToolRegistry,
    models: ModelResolver,
}

impl CrewRunner {
    /// Validates `config` and checks that every tool it names is registered.
    pub fn new(config: CrewConfig, tools: ToolRegistry, models: ModelResolver) -> Result<Self, AgentError> {
        config.validate().map_err(|e| AgentError::Config(e.to_string()))?;

        let mut missing: Vec<&str> = config
            .tool_names()
            .into_iter()
            .filter(|name| !tools.contains(name))
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(AgentError::UnknownTool(missing.join(", ")));
        }

        Ok(Self { config, tools, models })
    }

    pub fn config(&self) -> &CrewConfig {
        &self.config
    }

    /// Runs the crew's scheduled tasks for `verse`, one after another.
    pub async fn kickoff(
        &self,
        verse: &str,
        collector: &dyn MetricsCollector,
    ) -> Result<CrewOutput, AgentError> {
        let crew = self.config.render(verse);

        info!("╔══════════════════════════════════════════════════════════════");
        info!("║ CREW: {}", crew.name);
        info!("║ Verse: {}", verse.chars().take(50).collect::<String>());
        info!("╠══════════════════════════════════════════════════════════════");

        let execution = Execution { runner: self, crew: &crew, collector };
        let mut task_outputs: Vec<TaskOutput> = Vec::new();

        for (step, task) in crew.scheduled_tasks().into_iter().enumerate() {
            let agent = crew
                .agent(&task.agent)
                .ok_or_else(|| AgentError::UnknownAgent(task.agent.clone()))?;

            info!("╠──────────────────────────────────────────────────────────────");
            info!("║ [{}] TASK: {} → {}", step + 1, task.id, agent.role);

            let context: Vec<String> = task_outputs.iter().map(|t| t.output.clone()).collect();
            let opening = prompt::task_prompt(task, &context);

            let start_time = now_ms();
            let started = std::time::Instant::now();
            let mut metrics = TaskMetrics::new(&task.id, &agent.id);

            let output = execution
                .run_agent(agent, opening, &task.id, agent.allow_delegation, &mut metrics)
                .await?;

            metrics.elapsed_ms = started.elapsed().as_millis() as u64;
            info!("║     ✓ Completed in {} ms", metrics.elapsed_ms);

            collector.record(metrics.clone());
            collector.record_span(start_time, now_ms(), &task.description, &output, &metrics);

            task_outputs.push(TaskOutput {
                task_id: task.id.clone(),
                agent_id: agent.id.clone(),
                output,
            });
        }

        info!("║ Crew complete");
        info!("╚══════════════════════════════════════════════════════════════");

        let final_output = task_outputs.last().map(|t| t.output.clone()).unwrap_or_default();
        Ok(CrewOutput {
            final_output,
            task_outputs,
            metrics: collector.flush(),
        })
    }
}

#[cfg(test)]
mod tests;
