//! Unified LLM client that routes to the appropriate provider based on model name.

use async_trait::async_trait;
use versecrew_core::{AgentError, ChatModel, LlmResponse, Message, ModelConfig};

use crate::gemini::GeminiClient;
use crate::openai::OpenAiClient;

/// Provider type determined from model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Gemini,
    OpenAI,
}

impl ProviderType {
    pub fn detect(model: &str) -> Self {
        match model.starts_with("gemini") {
            true => ProviderType::Gemini,
            false => ProviderType::OpenAI,
        }
    }
}

enum Inner {
    Gemini(GeminiClient),
    OpenAI(OpenAiClient),
}

/// Unified client that routes requests to Gemini or OpenAI based on model name.
pub struct UnifiedLlmClient {
    provider: ProviderType,
    inner: Inner,
}

impl UnifiedLlmClient {
    /// Builds a client for `config`. `gemini_api_key` is only used for Gemini models;
    /// OpenAI models read `OPENAI_API_KEY` themselves.
    pub fn new(config: &ModelConfig, gemini_api_key: &str) -> Self {
        let provider = ProviderType::detect(&config.model);
        let inner = match provider {
            ProviderType::Gemini => {
                let client = GeminiClient::new(&config.model, gemini_api_key)
                    .with_temperature(config.temperature);
                Inner::Gemini(match &config.api_base {
                    Some(base) => client.with_api_base(base.as_str()),
                    None => client,
                })
            }
            ProviderType::OpenAI => Inner::OpenAI(
                OpenAiClient::new(&config.model, config.api_base.as_deref())
                    .with_temperature(config.temperature),
            ),
        };
        Self { provider, inner }
    }

    pub fn provider(&self) -> ProviderType {
        self.provider
    }
}

#[async_trait]
impl ChatModel for UnifiedLlmClient {
    fn model_name(&self) -> &str {
        match &self.inner {
            Inner::Gemini(c) => c.model_name(),
            Inner::OpenAI(c) => c.model_name(),
        }
    }

    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> Result<LlmResponse, AgentError> {
        match &self.inner {
            Inner::Gemini(c) => c.chat(system_prompt, messages).await,
            Inner::OpenAI(c) => c.chat(system_prompt, messages).await,
        }
    }
}
