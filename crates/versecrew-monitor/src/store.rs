//! SQLite-backed run storage.

use crate::run::{RunQuery, RunRecord, RunStatus, SpanRecord, ToolCallRecord};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

/// Errors from run store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Failed to prepare database path: {0}")]
    Io(#[from] std::io::Error),
    #[error("Lock error")]
    Lock,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

const RUN_COLUMNS: &str = "run_id, crew_id, crew_name, timestamp, input, email, output, \
     total_elapsed_ms, total_input_tokens, total_output_tokens, total_tool_calls, status";

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let status: String = row.get(11)?;
    Ok(RunRecord {
        run_id: row.get(0)?,
        crew_id: row.get(1)?,
        crew_name: row.get(2)?,
        timestamp: row.get(3)?,
        input: row.get(4)?,
        email: row.get(5)?,
        output: row.get(6)?,
        total_elapsed_ms: row.get(7)?,
        total_input_tokens: row.get(8)?,
        total_output_tokens: row.get(9)?,
        total_tool_calls: row.get(10)?,
        status: RunStatus::parse(&status).unwrap_or(RunStatus::Error),
    })
}

/// SQLite-backed run storage.
pub struct RunStore {
    conn: Mutex<Connection>,
}

impl RunStore {
    /// Opens (creating if needed) the database at `path`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Creates an in-memory run store (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                run_id TEXT PRIMARY KEY,
                crew_id TEXT NOT NULL,
                crew_name TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                input TEXT NOT NULL,
                email TEXT,
                output TEXT NOT NULL,
                total_elapsed_ms INTEGER NOT NULL,
                total_input_tokens INTEGER NOT NULL,
                total_output_tokens INTEGER NOT NULL,
                total_tool_calls INTEGER NOT NULL,
                status TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS spans (
                span_id TEXT PRIMARY KEY,
                run_id TEXT NOT NULL,
                task_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                start_time INTEGER NOT NULL,
                end_time INTEGER NOT NULL,
                input TEXT NOT NULL,
                output TEXT NOT NULL,
                input_tokens INTEGER NOT NULL,
                output_tokens INTEGER NOT NULL,
                tool_call_count INTEGER NOT NULL,
                iteration_count INTEGER NOT NULL,
                FOREIGN KEY (run_id) REFERENCES runs(run_id)
            );

            CREATE TABLE IF NOT EXISTS tool_calls (
                call_id TEXT PRIMARY KEY,
                span_id TEXT NOT NULL,
                tool_name TEXT NOT NULL,
                arguments TEXT NOT NULL,
                result TEXT NOT NULL,
                elapsed_ms INTEGER NOT NULL,
                FOREIGN KEY (span_id) REFERENCES spans(span_id)
            );

            CREATE INDEX IF NOT EXISTS idx_runs_timestamp ON runs(timestamp DESC);
            CREATE INDEX IF NOT EXISTS idx_runs_crew ON runs(crew_id);
            CREATE INDEX IF NOT EXISTS idx_spans_run ON spans(run_id);
            CREATE INDEX IF NOT EXISTS idx_tool_calls_span ON tool_calls(span_id);
            "#,
        )?;

        Ok(())
    }

    /// Inserts a new run record.
    pub fn insert_run(&self, run: &RunRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        conn.execute(
            &format!(
                "INSERT INTO runs ({RUN_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                run.run_id,
                run.crew_id,
                run.crew_name,
                run.timestamp,
                run.input,
                run.email,
                run.output,
                run.total_elapsed_ms,
                run.total_input_tokens,
                run.total_output_tokens,
                run.total_tool_calls,
                run.status.as_str(),
            ],
        )?;

        Ok(())
    }

    /// Updates the mutable columns of an existing run.
    pub fn update_run(&self, run: &RunRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        conn.execute(
            r#"UPDATE runs SET
               output = ?1, total_elapsed_ms = ?2, total_input_tokens = ?3,
               total_output_tokens = ?4, total_tool_calls = ?5, status = ?6
               WHERE run_id = ?7"#,
            params![
                run.output,
                run.total_elapsed_ms,
                run.total_input_tokens,
                run.total_output_tokens,
                run.total_tool_calls,
                run.status.as_str(),
                run.run_id,
            ],
        )?;

        Ok(())
    }

    /// Sets only the status of a run.
    pub fn set_status(&self, run_id: &str, status: RunStatus) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        conn.execute(
            "UPDATE runs SET status = ?1 WHERE run_id = ?2",
            params![status.as_str(), run_id],
        )?;
        Ok(())
    }

    /// Retrieves a run by ID.
    pub fn get_run(&self, run_id: &str) -> Result<Option<RunRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        let mut stmt = conn.prepare(&format!("SELECT {RUN_COLUMNS} FROM runs WHERE run_id = ?1"))?;

        match stmt.query_row(params![run_id], run_from_row) {
            Ok(run) => Ok(Some(run)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Lists runs, newest first, with optional filtering.
    pub fn list_runs(&self, query: &RunQuery) -> Result<Vec<RunRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        let mut sql = format!("SELECT {RUN_COLUMNS} FROM runs WHERE 1=1");
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref crew_id) = query.crew_id {
            sql.push_str(" AND crew_id = ?");
            params_vec.push(Box::new(crew_id.clone()));
        }

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            params_vec.push(Box::new(status.as_str().to_string()));
        }

        sql.push_str(" ORDER BY timestamp DESC");

        match (query.limit, query.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(params_refs.as_slice(), run_from_row)?;

        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?);
        }

        Ok(runs)
    }

    /// Inserts a span record.
    pub fn insert_span(&self, span: &SpanRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        conn.execute(
            r#"INSERT INTO spans
               (span_id, run_id, task_id, agent_id, start_time, end_time,
                input, output, input_tokens, output_tokens, tool_call_count, iteration_count)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
            params![
                span.span_id,
                span.run_id,
                span.task_id,
                span.agent_id,
                span.start_time,
                span.end_time,
                span.input,
                span.output,
                span.input_tokens,
                span.output_tokens,
                span.tool_call_count,
                span.iteration_count,
            ],
        )?;

        Ok(())
    }

    /// Gets all spans for a run in execution order.
    pub fn get_spans(&self, run_id: &str) -> Result<Vec<SpanRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        let mut stmt = conn.prepare(
            r#"SELECT span_id, run_id, task_id, agent_id, start_time, end_time,
               input, output, input_tokens, output_tokens, tool_call_count, iteration_count
               FROM spans WHERE run_id = ?1 ORDER BY start_time"#,
        )?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok(SpanRecord {
                span_id: row.get(0)?,
                run_id: row.get(1)?,
                task_id: row.get(2)?,
                agent_id: row.get(3)?,
                start_time: row.get(4)?,
                end_time: row.get(5)?,
                input: row.get(6)?,
                output: row.get(7)?,
                input_tokens: row.get(8)?,
                output_tokens: row.get(9)?,
                tool_call_count: row.get(10)?,
                iteration_count: row.get(11)?,
            })
        })?;

        let mut spans = Vec::new();
        for row in rows {
            spans.push(row?);
        }

        Ok(spans)
    }

    /// Inserts a tool call record.
    pub fn insert_tool_call(&self, call: &ToolCallRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        conn.execute(
            r#"INSERT INTO tool_calls (call_id, span_id, tool_name, arguments, result, elapsed_ms)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                call.call_id,
                call.span_id,
                call.tool_name,
                serde_json::to_string(&call.arguments)?,
                call.result,
                call.elapsed_ms,
            ],
        )?;

        Ok(())
    }

    /// Gets all tool calls for a span.
    pub fn get_tool_calls(&self, span_id: &str) -> Result<Vec<ToolCallRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        let mut stmt = conn.prepare(
            r#"SELECT call_id, span_id, tool_name, arguments, result, elapsed_ms
               FROM tool_calls WHERE span_id = ?1 ORDER BY rowid"#,
        )?;

        let rows = stmt.query_map(params![span_id], |row| {
            let args_str: String = row.get(3)?;
            Ok(ToolCallRecord {
                call_id: row.get(0)?,
                span_id: row.get(1)?,
                tool_name: row.get(2)?,
                arguments: serde_json::from_str(&args_str).unwrap_or(serde_json::Value::Null),
                result: row.get(4)?,
                elapsed_ms: row.get(5)?,
            })
        })?;

        let mut calls = Vec::new();
        for row in rows {
            calls.push(row?);
        }

        Ok(calls)
    }

    /// Deletes a run and all its spans and tool calls. Returns whether the run existed.
    pub fn delete_run(&self, run_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        conn.execute(
            r#"DELETE FROM tool_calls WHERE span_id IN
               (SELECT span_id FROM spans WHERE run_id = ?1)"#,
            params![run_id],
        )?;
        conn.execute("DELETE FROM spans WHERE run_id = ?1", params![run_id])?;
        let removed = conn.execute("DELETE FROM runs WHERE run_id = ?1", params![run_id])?;

        Ok(removed > 0)
    }

    /// Marks every `queued` or `running` run as `error` with `reason` as its output.
    /// Returns how many runs were closed.
    pub fn fail_unfinished(&self, reason: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        let closed = conn.execute(
            "UPDATE runs SET status = ?1, output = ?2 WHERE status IN (?3, ?4)",
            params![
                RunStatus::Error.as_str(),
                reason,
                RunStatus::Queued.as_str(),
                RunStatus::Running.as_str(),
            ],
        )?;

        Ok(closed)
    }

    /// Gets aggregate metrics across all runs.
    pub fn metrics_summary(&self) -> Result<MetricsSummary, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        let mut stmt = conn.prepare(
            r#"SELECT
               COUNT(*),
               COALESCE(SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END), 0),
               COALESCE(SUM(CASE WHEN status = 'error' THEN 1 ELSE 0 END), 0),
               COALESCE(SUM(total_input_tokens), 0),
               COALESCE(SUM(total_output_tokens), 0),
               COALESCE(SUM(total_tool_calls), 0),
               COALESCE(AVG(CASE WHEN status IN ('success', 'error') THEN total_elapsed_ms END), 0)
               FROM runs"#,
        )?;

        let summary = stmt.query_row([], |row| {
            Ok(MetricsSummary {
                total_runs: row.get(0)?,
                successful_runs: row.get(1)?,
                failed_runs: row.get(2)?,
                total_input_tokens: row.get(3)?,
                total_output_tokens: row.get(4)?,
                total_tool_calls: row.get(5)?,
                avg_latency_ms: row.get(6)?,
            })
        })?;

        Ok(summary)
    }
}

/// Aggregate metrics summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_tool_calls: u64,
    pub avg_latency_ms: f64,
}
