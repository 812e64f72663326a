//! Collector that persists runs, spans and tool calls to a RunStore.

use crate::run::{RunRecord, RunStatus, SpanRecord, ToolCallRecord};
use crate::store::RunStore;
use crate::{now_ms, CrewMetrics, MetricsCollector, TaskMetrics};
use std::sync::{Arc, Mutex};

/// Tool call seen before its task span was written.
struct PendingToolCall {
    task_id: String,
    record: ToolCallRecord,
}

/// Collector bound to a single run.
pub struct RunCollector {
    store: Arc<RunStore>,
    run: RunRecord,
    start_time: i64,
    metrics: Mutex<Vec<TaskMetrics>>,
    pending_calls: Mutex<Vec<PendingToolCall>>,
}

impl RunCollector {
    /// Inserts a new run in the `running` state.
    pub fn begin(
        store: Arc<RunStore>,
        crew_id: impl Into<String>,
        crew_name: impl Into<String>,
        input: impl Into<String>,
        email: Option<String>,
    ) -> Self {
        let run = RunRecord::new(crew_id, crew_name, input, email, RunStatus::Running);
        if let Err(e) = store.insert_run(&run) {
            tracing::warn!("Failed to insert run: {}", e);
        }
        Self::with_run(store, run)
    }

    /// Picks up a run inserted earlier (typically `queued`) and marks it `running`.
    pub fn resume(store: Arc<RunStore>, mut run: RunRecord) -> Self {
        run.status = RunStatus::Running;
        if let Err(e) = store.set_status(&run.run_id, RunStatus::Running) {
            tracing::warn!("Failed to mark run {} running: {}", run.run_id, e);
        }
        Self::with_run(store, run)
    }

    fn with_run(store: Arc<RunStore>, run: RunRecord) -> Self {
        Self {
            store,
            run,
            start_time: now_ms(),
            metrics: Mutex::new(Vec::new()),
            pending_calls: Mutex::new(Vec::new()),
        }
    }

    /// Returns the run ID.
    pub fn run_id(&self) -> &str {
        &self.run.run_id
    }

    /// Finalizes the run with the given output and status.
    pub fn finalize(&self, output: &str, status: RunStatus) -> RunRecord {
        let metrics = self.flush();

        let mut run = self.run.clone();
        run.output = output.to_string();
        run.total_elapsed_ms = (now_ms() - self.start_time).max(0) as u64;
        run.total_input_tokens = metrics.total_input_tokens;
        run.total_output_tokens = metrics.total_output_tokens;
        run.total_tool_calls = metrics.total_tool_calls;
        run.status = status;

        if let Err(e) = self.store.update_run(&run) {
            tracing::warn!("Failed to update run: {}", e);
        }
        run
    }

    /// Marks the run as successful with the given output.
    pub fn success(&self, output: &str) -> RunRecord {
        self.finalize(output, RunStatus::Success)
    }

    /// Marks the run as failed with the given error message.
    pub fn error(&self, error: &str) -> RunRecord {
        self.finalize(error, RunStatus::Error)
    }
}

impl MetricsCollector for RunCollector {
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

    fn record_tool_call(&self, task_id: &str, tool_name: &str, input: &str, result: &str, elapsed_ms: u64) {
        let record = ToolCallRecord {
            call_id: uuid::Uuid::new_v4().to_string(),
            span_id: String::new(),
            tool_name: tool_name.to_string(),
            arguments: serde_json::json!({ "input": input }),
            result: result.to_string(),
            elapsed_ms,
        };
        let Ok(mut pending) = self.pending_calls.lock() else { return };
        pending.push(PendingToolCall { task_id: task_id.to_string(), record });
    }

    fn record_span(
        &self,
        start_time: i64,
        end_time: i64,
        input: &str,
        output: &str,
        metrics: &TaskMetrics,
    ) {
        let span = SpanRecord {
            span_id: uuid::Uuid::new_v4().to_string(),
            run_id: self.run.run_id.clone(),
            task_id: metrics.task_id.clone(),
            agent_id: metrics.agent_id.clone(),
            start_time,
            end_time,
            input: input.to_string(),
            output: output.to_string(),
            input_tokens: metrics.input_tokens,
            output_tokens: metrics.output_tokens,
            tool_call_count: metrics.tool_call_count,
            iteration_count: metrics.iteration_count,
        };

        if let Err(e) = self.store.insert_span(&span) {
            tracing::warn!("Failed to insert span: {}", e);
            return;
        }

        let Ok(mut pending) = self.pending_calls.lock() else { return };
        let (mine, rest): (Vec<_>, Vec<_>) = pending
            .drain(..)
            .partition(|p| p.task_id == metrics.task_id);
        *pending = rest;

        for PendingToolCall { mut record, .. } in mine {
            record.span_id = span.span_id.clone();
            if let Err(e) = self.store.insert_tool_call(&record) {
                tracing::warn!("Failed to insert tool call: {}", e);
            }
        }
    }

    fn flush(&self) -> CrewMetrics {
        let Ok(guard) = self.metrics.lock() else {
            return CrewMetrics {
                crew_id: self.run.crew_id.clone(),
                ..Default::default()
            };
        };
        CrewMetrics::aggregate(self.run.crew_id.clone(), guard.clone())
    }

    fn reset(&self) {
        if let Ok(mut guard) = self.metrics.lock() {
            guard.clear();
        }
        if let Ok(mut pending) = self.pending_calls.lock() {
            pending.clear();
        }
    }
}
