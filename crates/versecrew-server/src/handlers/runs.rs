//! Run history API handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use versecrew_monitor::{MetricsSummary, RunQuery, RunRecord, RunStatus, SpanRecord, ToolCallRecord};

use crate::error::AppError;
use crate::ServerState;

const DEFAULT_LIMIT: u32 = 50;

/// Response for listing runs.
#[derive(Serialize)]
pub struct RunsListResponse {
    pub runs: Vec<RunRecord>,
}

/// A span together with the tool calls made during it.
#[derive(Serialize)]
pub struct SpanDetail {
    #[serde(flatten)]
    pub span: SpanRecord,
    pub tool_calls: Vec<ToolCallRecord>,
}

/// Response for a single run with spans.
#[derive(Serialize)]
pub struct RunDetailResponse {
    pub run: RunRecord,
    pub spans: Vec<SpanDetail>,
}

/// Query parameters for listing runs.
#[derive(Debug, Deserialize, Default)]
pub struct ListRunsQuery {
    pub crew_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// GET /api/runs - List runs, newest first.
pub async fn list(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<ListRunsQuery>,
) -> Result<Json<RunsListResponse>, AppError> {
    let status = match params.status.as_deref() {
        Some(raw) => Some(
            RunStatus::parse(raw).ok_or_else(|| AppError::BadRequest(format!("unknown status '{}'", raw)))?,
        ),
        None => None,
    };

    let query = RunQuery {
        crew_id: params.crew_id,
        status,
        limit: params.limit.or(Some(DEFAULT_LIMIT)),
        offset: params.offset,
    };

    let runs = state.store.list_runs(&query)?;
    Ok(Json(RunsListResponse { runs }))
}

/// GET /api/runs/{id} - A run with its spans and their tool calls.
pub async fn get(
    State(state): State<Arc<ServerState>>,
    Path(run_id): Path<String>,
) -> Result<Json<RunDetailResponse>, AppError> {
    let run = state
        .store
        .get_run(&run_id)?
        .ok_or_else(|| AppError::NotFound("run not found".into()))?;

    let spans = state
        .store
        .get_spans(&run_id)?
        .into_iter()
        .map(|span| -> Result<SpanDetail, AppError> {
            let tool_calls = state.store.get_tool_calls(&span.span_id)?;
            Ok(SpanDetail { span, tool_calls })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(Json(RunDetailResponse { run, spans }))
}

/// DELETE /api/runs/{id} - Delete a run and everything recorded for it.
pub async fn delete(
    State(state): State<Arc<ServerState>>,
    Path(run_id): Path<String>,
) -> Result<Json<()>, AppError> {
    if !state.store.delete_run(&run_id)? {
        return Err(AppError::NotFound("run not found".into()));
    }
    Ok(Json(()))
}

/// GET /api/metrics/summary - Aggregate metrics across runs.
pub async fn metrics_summary(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<MetricsSummary>, AppError> {
    Ok(Json(state.store.metrics_summary()?))
}
