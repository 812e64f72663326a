//! Crew configuration schema for versecrew.
//!
//! A crew is a set of agents plus the tasks they work on. Text fields may
//! contain the `{verse}` placeholder, filled in by [`CrewConfig::render`].

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

mod preset;

/// Placeholder substituted with the submitted verse.
pub const VERSE_PLACEHOLDER: &str = "{verse}";

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid crew config: {0}")]
    Invalid(String),

    #[error("Preset not found: {0}")]
    PresetNotFound(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Process
// ─────────────────────────────────────────────────────────────────────────────

/// How tasks are scheduled across the crew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Process {
    /// Tasks run one after another; each sees the outputs before it.
    #[default]
    Sequential,
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Structs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub allow_delegation: bool,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_iterations: Option<u32>,
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub id: String,
    pub description: String,
    pub agent: String,
    #[serde(default)]
    pub expected_output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub agents: Vec<AgentConfig>,
    pub tasks: Vec<TaskConfig>,
    /// Task ids to run, in order. Empty runs every task in declaration order.
    #[serde(default)]
    pub kickoff: Vec<String>,
    #[serde(default)]
    pub process: Process,
}

impl CrewConfig {
    /// The built-in three-agent biblical research crew.
    pub fn biblical() -> Self {
        preset::biblical()
    }

    pub fn agent(&self, id: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn task(&self, id: &str) -> Option<&TaskConfig> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Finds a coworker by id or role, ignoring case and surrounding whitespace.
    pub fn find_agent(&self, name: &str) -> Option<&AgentConfig> {
        let needle = name.trim().trim_matches('"').to_lowercase();
        self.agents
            .iter()
            .find(|a| a.id.to_lowercase() == needle || a.role.to_lowercase() == needle)
    }

    /// Tasks that run on kickoff, in execution order.
    pub fn scheduled_tasks(&self) -> Vec<&TaskConfig> {
        if self.kickoff.is_empty() {
            return self.tasks.iter().collect();
        }
        self.kickoff.iter().filter_map(|id| self.task(id)).collect()
    }

    /// Every tool name referenced by any agent.
    pub fn tool_names(&self) -> HashSet<&str> {
        self.agents
            .iter()
            .flat_map(|a| a.tools.iter().map(|t| t.as_str()))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut agent_ids = HashSet::new();
        for agent in &self.agents {
            if !agent_ids.insert(agent.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate agent id '{}'", agent.id)));
            }
        }

        let mut task_ids = HashSet::new();
        for task in &self.tasks {
            if !task_ids.insert(task.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate task id '{}'", task.id)));
            }
            if !agent_ids.contains(task.agent.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "task '{}' assigned to unknown agent '{}'",
                    task.id, task.agent
                )));
            }
        }

        if let Some(missing) = self.kickoff.iter().find(|id| !task_ids.contains(id.as_str())) {
            return Err(ConfigError::Invalid(format!("kickoff names unknown task '{}'", missing)));
        }

        if self.scheduled_tasks().is_empty() {
            return Err(ConfigError::Invalid("crew has no tasks to run".into()));
        }

        Ok(())
    }

    /// Returns a copy with every `{verse}` placeholder replaced.
    pub fn render(&self, verse: &str) -> Self {
        let fill = |s: &str| s.replace(VERSE_PLACEHOLDER, verse);
        let mut rendered = self.clone();
        for agent in &mut rendered.agents {
            agent.role = fill(&agent.role);
            agent.goal = fill(&agent.goal);
            agent.backstory = fill(&agent.backstory);
        }
        for task in &mut rendered.tasks {
            task.description = fill(&task.description);
            task.expected_output = task.expected_output.as_deref().map(fill);
        }
        rendered
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Preset Registry
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct PresetRegistry {
    presets: HashMap<String, CrewConfig>,
}

impl PresetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding only the built-in biblical crew.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.insert(CrewConfig::biblical());
        registry
    }

    /// Loads every `*.json` crew in `dir` on top of the built-in presets.
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let mut registry = Self::builtin();

        let entries = fs::read_dir(dir)?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let content = fs::read_to_string(&path)?;
                let config: CrewConfig = serde_json::from_str(&content)?;
                config.validate()?;
                registry.insert(config);
            }
        }

        Ok(registry)
    }

    pub fn insert(&mut self, config: CrewConfig) {
        self.presets.insert(config.id.clone(), config);
    }

    pub fn get(&self, id: &str) -> Result<&CrewConfig, ConfigError> {
        self.presets
            .get(id)
            .ok_or_else(|| ConfigError::PresetNotFound(id.to_string()))
    }

    pub fn ids(&self) -> Vec<&str> {
        self.presets.keys().map(|s| s.as_str()).collect()
    }
}
