//! Run history record types.

use serde::{Deserialize, Serialize};

/// One crew kickoff for one verse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique run identifier.
    pub run_id: String,
    /// Crew preset identifier.
    pub crew_id: String,
    /// Crew name for display.
    pub crew_name: String,
    /// Unix timestamp (milliseconds) when the run was created.
    pub timestamp: i64,
    /// The verse the crew worked on.
    pub input: String,
    /// Address the result is delivered to, if any.
    pub email: Option<String>,
    /// Final crew output, or the error message for failed runs.
    pub output: String,
    pub total_elapsed_ms: u64,
    pub total_input_tokens: u32,
    pub total_output_tokens: u32,
    pub total_tool_calls: u32,
    pub status: RunStatus,
}

impl RunRecord {
    /// A fresh record with zeroed totals.
    pub fn new(
        crew_id: impl Into<String>,
        crew_name: impl Into<String>,
        input: impl Into<String>,
        email: Option<String>,
        status: RunStatus,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            crew_id: crew_id.into(),
            crew_name: crew_name.into(),
            timestamp: crate::now_ms(),
            input: input.into(),
            email,
            output: String::new(),
            total_elapsed_ms: 0,
            total_input_tokens: 0,
            total_output_tokens: 0,
            total_tool_calls: 0,
            status,
        }
    }
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Accepted, waiting for a worker.
    Queued,
    /// The crew is working.
    Running,
    /// Completed successfully.
    Success,
    /// Failed with an error.
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(RunStatus::Queued),
            "running" => Some(RunStatus::Running),
            "success" => Some(RunStatus::Success),
            "error" => Some(RunStatus::Error),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Error)
    }
}

/// A single task execution within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanRecord {
    pub span_id: String,
    pub run_id: String,
    /// Task identifier.
    pub task_id: String,
    /// Agent that performed the task.
    pub agent_id: String,
    pub start_time: i64,
    pub end_time: i64,
    pub input: String,
    pub output: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub tool_call_count: u32,
    pub iteration_count: u32,
}

/// A tool invocation made while a task ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub call_id: String,
    pub span_id: String,
    pub tool_name: String,
    /// Tool arguments as JSON.
    pub arguments: serde_json::Value,
    pub result: String,
    pub elapsed_ms: u64,
}

/// Query parameters for listing runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunQuery {
    pub crew_id: Option<String>,
    pub status: Option<RunStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
