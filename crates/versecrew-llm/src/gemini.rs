//! Google Gemini `generateContent` client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use versecrew_core::{AgentError, ChatModel, LlmMetrics, LlmResponse, Message, MessageRole};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: UsageMetadata,
}

/// Request URLs never reach error text.
fn transport_error(e: reqwest::Error) -> AgentError {
    AgentError::LlmError(e.without_url().to_string())
}

/// Client for Gemini models.
pub struct GeminiClient {
    client: Client,
    model: String,
    api_key: String,
    api_base: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(model: &str, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        tracing::info!("GeminiClient: model={}, api_key_len={}", model, api_key.len());
        Self {
            client: Client::new(),
            model: model.to_string(),
            api_key,
            api_base: GEMINI_API_BASE.to_string(),
            temperature: 0.5,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> Result<LlmResponse, AgentError> {
        let start = std::time::Instant::now();

        let contents = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| Content {
                role: Some(match m.role {
                    MessageRole::Assistant => "model",
                    _ => "user",
                }),
                parts: vec![Part { text: &m.content }],
            })
            .collect();

        let request = GenerateRequest {
            system_instruction: (!system_prompt.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part { text: system_prompt }],
            }),
            contents,
            generation_config: GenerationConfig { temperature: self.temperature },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::LlmError(format!("Gemini API error {}: {}", status, body)));
        }

        let resp: GenerateResponse = response.json().await.map_err(transport_error)?;

        let Some(content) = resp.candidates.into_iter().find_map(|c| c.content) else {
            return Err(AgentError::LlmError("Gemini returned no candidates".into()));
        };

        let text = content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(LlmResponse {
            content: text,
            metrics: LlmMetrics {
                input_tokens: resp.usage_metadata.prompt_token_count.unwrap_or(0),
                output_tokens: resp.usage_metadata.candidates_token_count.unwrap_or(0),
                elapsed_ms: start.elapsed().as_millis() as u64,
            },
        })
    }
}
