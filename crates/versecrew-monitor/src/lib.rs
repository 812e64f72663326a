//! Run history and metrics collection for versecrew crews.

mod collector;
mod run;
mod store;

pub use collector::RunCollector;
pub use run::{RunQuery, RunRecord, RunStatus, SpanRecord, ToolCallRecord};
pub use store::{MetricsSummary, RunStore, StoreError};

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Metrics collected from a single task execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMetrics {
    /// Task identifier.
    pub task_id: String,
    /// Agent that performed the task.
    pub agent_id: String,
    /// Input tokens consumed.
    pub input_tokens: u32,
    /// Output tokens generated.
    pub output_tokens: u32,
    /// Total elapsed time in milliseconds.
    pub elapsed_ms: u64,
    /// Number of tool calls made (delegations included).
    pub tool_call_count: u32,
    /// Number of LLM calls in the agent loop.
    pub iteration_count: u32,
}

impl TaskMetrics {
    pub fn new(task_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            agent_id: agent_id.into(),
            ..Default::default()
        }
    }

    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Aggregated metrics for a crew kickoff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrewMetrics {
    pub crew_id: String,
    pub total_input_tokens: u32,
    pub total_output_tokens: u32,
    pub total_elapsed_ms: u64,
    pub total_tool_calls: u32,
    /// Per-task metrics, in execution order.
    pub task_metrics: Vec<TaskMetrics>,
}

impl CrewMetrics {
    pub fn aggregate(crew_id: impl Into<String>, task_metrics: Vec<TaskMetrics>) -> Self {
        let mut cm = CrewMetrics {
            crew_id: crew_id.into(),
            task_metrics,
            ..Default::default()
        };

        for m in &cm.task_metrics {
            cm.total_input_tokens += m.input_tokens;
            cm.total_output_tokens += m.output_tokens;
            cm.total_elapsed_ms += m.elapsed_ms;
            cm.total_tool_calls += m.tool_call_count;
        }

        cm
    }

    pub fn total_tokens(&self) -> u32 {
        self.total_input_tokens + self.total_output_tokens
    }
}

/// Trait for metrics collectors.
pub trait MetricsCollector: Send + Sync {
    /// Record metrics from a task execution.
    fn record(&self, metrics: TaskMetrics);
    /// Record a tool invocation made while `task_id` ran.
    fn record_tool_call(
        &self,
        _task_id: &str,
        _tool_name: &str,
        _input: &str,
        _result: &str,
        _elapsed_ms: u64,
    ) {
    }
    /// Record a span with task I/O for detailed run history.
    fn record_span(
        &self,
        _start_time: i64,
        _end_time: i64,
        _input: &str,
        _output: &str,
        _metrics: &TaskMetrics,
    ) {
    }
    /// Return aggregated crew metrics.
    fn flush(&self) -> CrewMetrics;
    /// Reset the collector for a new kickoff.
    fn reset(&self);
}

/// In-memory metrics collector (default implementation).
pub struct InMemoryCollector {
    crew_id: String,
    metrics: Mutex<Vec<TaskMetrics>>,
}

impl InMemoryCollector {
    pub fn new(crew_id: impl Into<String>) -> Self {
        Self {
            crew_id: crew_id.into(),
            metrics: Mutex::new(Vec::new()),
        }
    }
}

impl MetricsCollector for InMemoryCollector {
    fn record(&self, metrics: TaskMetrics) {
        let Ok(mut guard) = self.metrics.lock() else {
            tracing::warn!("Failed to acquire metrics lock");
            return;
        };
        tracing::debug!(
            task_id = %metrics.task_id,
            input_tokens = metrics.input_tokens,
            output_tokens = metrics.output_tokens,
            elapsed_ms = metrics.elapsed_ms,
            "Recorded task metrics"
        );
        guard.push(metrics);
    }

    fn flush(&self) -> CrewMetrics {
        let Ok(guard) = self.metrics.lock() else {
            return CrewMetrics {
                crew_id: self.crew_id.clone(),
                ..Default::default()
            };
        };
        CrewMetrics::aggregate(self.crew_id.clone(), guard.clone())
    }

    fn reset(&self) {
        let Ok(mut guard) = self.metrics.lock() else {
            return;
        };
        guard.clear();
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_collector() {
        let collector = InMemoryCollector::new("biblical");

        collector.record(TaskMetrics {
            task_id: "article".to_string(),
            agent_id: "journalist".to_string(),
            input_tokens: 100,
            output_tokens: 50,
            elapsed_ms: 200,
            tool_call_count: 2,
            iteration_count: 3,
        });

        collector.record(TaskMetrics {
            task_id: "history".to_string(),
            agent_id: "historian".to_string(),
            input_tokens: 150,
            output_tokens: 75,
            elapsed_ms: 300,
            tool_call_count: 0,
            iteration_count: 1,
        });

        let metrics = collector.flush();
        assert_eq!(metrics.crew_id, "biblical");
        assert_eq!(metrics.total_input_tokens, 250);
        assert_eq!(metrics.total_output_tokens, 125);
        assert_eq!(metrics.total_tokens(), 375);
        assert_eq!(metrics.total_elapsed_ms, 500);
        assert_eq!(metrics.total_tool_calls, 2);
        assert_eq!(metrics.task_metrics.len(), 2);

        collector.reset();
        assert!(collector.flush().task_metrics.is_empty());
    }

    #[test]
    fn test_run_status_round_trip_names() {
        for status in [RunStatus::Queued, RunStatus::Running, RunStatus::Success, RunStatus::Error] {
            assert_eq!(RunStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RunStatus::parse("paused"), None);
        assert!(RunStatus::Error.is_finished());
        assert!(!RunStatus::Queued.is_finished());
    }
}
