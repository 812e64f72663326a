//! Core domain types and error definitions for versecrew.
//!
//! This crate provides the fundamental types shared across the workspace:
//!
//! - [`AgentError`]: Error type for crew, tool and LLM operations
//! - [`Message`] and [`MessageRole`]: Conversation message types
//! - [`ModelConfig`]: LLM model configuration
//! - [`ChatModel`]: The seam every LLM provider implements
//!
//! # Example
//!
//! ```rust
//! use versecrew_core::{Message, MessageRole, ModelConfig};
//!
//! let msg = Message::user("Explain John 3:16");
//! assert_eq!(msg.role, MessageRole::User);
//!
//! let model = ModelConfig::new("gemini-pro");
//! assert_eq!(model.temperature, 0.5);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during crew execution, tool calls or LLM operations.
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM API request failed.
    #[error("LLM request failed: {0}")]
    LlmError(String),

    /// Failed to parse a response body or agent output.
    #[error("Failed to parse output: {0}")]
    ParseError(String),

    /// A tool ran but could not produce a result.
    #[error("Tool execution failed: {0}")]
    ToolFailed(String),

    /// External API call failed.
    #[error("External API error: {0}")]
    ExternalApi(String),

    /// An agent ran out of reasoning steps.
    #[error("Max iterations exceeded for agent {0}")]
    MaxIterationsExceeded(String),

    /// Unknown agent referenced by a task or delegation.
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// Unknown tool referenced by an agent.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Crew configuration is unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::ParseError(err.to_string())
    }
}

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions framing the conversation.
    System,
    /// Message from the user (or an observation fed back to the agent).
    User,
    /// Message from the assistant/LLM.
    Assistant,
}

/// A single message in a conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
}

impl Message {
    /// Creates a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: MessageRole::System, content: content.into() }
    }

    /// Creates a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }

    /// Creates a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into() }
    }
}

/// Configuration for an LLM model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Unique identifier for this model configuration.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// The actual model identifier (e.g., "gemini-pro", "gpt-4o").
    pub model: String,
    /// Optional API base URL for self-hosted or alternative endpoints.
    #[serde(default)]
    pub api_base: Option<String>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.5
}

impl ModelConfig {
    /// Creates a config whose id and name are the model identifier.
    pub fn new(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            id: model.clone(),
            name: model.clone(),
            model,
            api_base: None,
            temperature: default_temperature(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Usage numbers reported for a single LLM call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmMetrics {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub elapsed_ms: u64,
}

/// A complete (non-streaming) LLM response.
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub content: String,
    pub metrics: LlmMetrics,
}

impl LlmResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), metrics: LlmMetrics::default() }
    }
}

/// A chat-capable language model.
///
/// `messages` never contains [`MessageRole::System`] entries; the system
/// prompt is passed separately so providers can place it where their API
/// expects it.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Identifier used in logs and metrics.
    fn model_name(&self) -> &str;

    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> Result<LlmResponse, AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("s").role, MessageRole::System);
        assert_eq!(Message::user("u").role, MessageRole::User);
        assert_eq!(Message::assistant("a").content, "a");
    }

    #[test]
    fn test_model_config_defaults_from_json() {
        let cfg: ModelConfig = serde_json::from_str(
            r#"{"id":"g","name":"Gemini","model":"gemini-pro"}"#,
        )
        .unwrap();
        assert_eq!(cfg.api_base, None);
        assert!((cfg.temperature - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_serde_error_maps_to_parse_error() {
        let err: AgentError = serde_json::from_str::<ModelConfig>("{").unwrap_err().into();
        assert!(matches!(err, AgentError::ParseError(_)));
    }
}
