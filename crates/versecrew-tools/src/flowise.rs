//! Bible Q&A through a Flowise prediction endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::warn;
use versecrew_core::AgentError;

use crate::{format_results, Tool};

pub const DEFAULT_FLOWISE_URL: &str =
    "https://flow.koltelecom.com/api/v1/prediction/56c19c1f-1e29-436b-b322-df00eb66a998";

/// `bible_question`: asks a Flowise chatflow tuned for Bible and Christianity questions.
pub struct FlowiseQuestion {
    client: Client,
    url: String,
}

impl FlowiseQuestion {
    pub fn new(url: impl Into<String>) -> Self {
        Self { client: Client::new(), url: url.into() }
    }
}

impl Default for FlowiseQuestion {
    fn default() -> Self {
        Self::new(DEFAULT_FLOWISE_URL)
    }
}

/// Pulls the answer out of a prediction body: `answer` first, then `text`.
fn extract_answer(body: &Value) -> String {
    match body.get("answer") {
        Some(Value::Array(_)) => return format_results(&body["answer"], 1),
        Some(Value::String(s)) => return s.clone(),
        _ => {}
    }
    body.get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl Tool for FlowiseQuestion {
    fn name(&self) -> &str {
        "bible_question"
    }

    fn description(&self) -> &str {
        "Ask any question about the Bible and Christianity and get a relevant answer."
    }

    async fn call(&self, input: &str) -> Result<String, AgentError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "question": input }))
            .send()
            .await
            .map_err(|e| AgentError::ExternalApi(e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            warn!(status = %response.status(), "flowise prediction failed");
            return Ok("Failed to get result from Flowise.".to_string());
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::ExternalApi(e.to_string()))?;
        Ok(extract_answer(&body))
    }
}
