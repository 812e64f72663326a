//! Verse processing handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use versecrew_monitor::{RunCollector, RunRecord, RunStatus};
use versecrew_tools::OutgoingEmail;

use crate::error::AppError;
use crate::ServerState;

const NO_VERSE: &str = "No verse provided";
const PROCESSING_FAILED: &str = "Failed to process verse";

#[derive(Debug, Deserialize, Default)]
pub struct VerseQuery {
    pub verse: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerseRequest {
    #[serde(default)]
    pub verse: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub run_id: String,
    pub status: &'static str,
}

fn require_verse(verse: Option<&str>) -> Result<&str, AppError> {
    verse
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(NO_VERSE.into()))
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

/// GET /process_verse?verse= - Run the crew and return its answer.
pub async fn process(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<VerseQuery>,
) -> Result<Json<String>, AppError> {
    let verse = require_verse(params.verse.as_deref())?;
    let crew = state.runner.config();
    let collector = RunCollector::begin(state.store.clone(), &crew.id, &crew.name, verse, None);

    match state.runner.kickoff(verse, &collector).await {
        Ok(output) => {
            collector.success(&output.final_output);
            Ok(Json(output.final_output))
        }
        Err(e) => {
            error!("Crew failed for {}: {}", verse, e);
            collector.error(&e.to_string());
            Err(AppError::Internal(PROCESSING_FAILED.into()))
        }
    }
}

/// POST /process_verse - Queue a run whose result is mailed to `email`.
pub async fn submit(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<VerseRequest>,
) -> Result<(StatusCode, Json<QueuedResponse>), AppError> {
    let verse = require_verse(Some(req.verse.as_str()))?.to_string();
    let email = req.email.trim();
    if !is_valid_email(email) {
        return Err(AppError::BadRequest("Invalid email".into()));
    }

    let crew = state.runner.config();
    let run = RunRecord::new(&crew.id, &crew.name, verse, Some(email.to_string()), RunStatus::Queued);
    state.store.insert_run(&run)?;

    let run_id = run.run_id.clone();
    info!("Queued run {} for {}", run_id, run.input);
    tokio::spawn(process_in_background(state.clone(), run));

    Ok((
        StatusCode::ACCEPTED,
        Json(QueuedResponse { run_id, status: RunStatus::Queued.as_str() }),
    ))
}

async fn process_in_background(state: Arc<ServerState>, run: RunRecord) {
    // Runs wait here, still `queued`, until a slot frees up.
    let Ok(_slot) = state.run_slots.acquire().await else {
        warn!("Run slots closed; run {} left queued", run.run_id);
        return;
    };

    let verse = run.input.clone();
    let recipient = run.email.clone();
    let collector = RunCollector::resume(state.store.clone(), run);

    let (subject, body) = match state.runner.kickoff(&verse, &collector).await {
        Ok(output) => {
            collector.success(&output.final_output);
            (format!("Your research on {}", verse), output.final_output)
        }
        Err(e) => {
            error!("Run {} failed: {}", collector.run_id(), e);
            collector.error(&e.to_string());
            (
                format!("Research on {} failed", verse),
                format!(
                    "An error occurred while researching {}. Please try again later.",
                    verse
                ),
            )
        }
    };

    let (Some(mailer), Some(to)) = (&state.mailer, recipient) else {
        info!("Run {} finished; no mailer configured", collector.run_id());
        return;
    };

    match mailer.send(&OutgoingEmail { to, subject, body }).await {
        Ok(()) => info!("Run {} result mailed", collector.run_id()),
        Err(e) => warn!("Failed to mail run {}: {}", collector.run_id(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_verse() {
        assert_eq!(require_verse(Some("  John 3:16 ")).unwrap(), "John 3:16");
        assert!(matches!(require_verse(Some("   ")), Err(AppError::BadRequest(m)) if m == NO_VERSE));
        assert!(require_verse(None).is_err());
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("reader@example.com"));
        assert!(!is_valid_email("reader.example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("reader@"));
        assert!(!is_valid_email("a@b@c"));
        assert!(!is_valid_email(""));
    }
}
