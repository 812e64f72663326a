//! OpenAI-compatible chat completions client.

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use versecrew_core::{AgentError, ChatModel, LlmMetrics, LlmResponse, Message, MessageRole};

/// Client for OpenAI (or any server speaking its chat completions API).
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiClient {
    /// Reads `OPENAI_API_KEY` from the environment.
    pub fn new(model: &str, api_base: Option<&str>) -> Self {
        let config = match api_base {
            Some(base) => OpenAIConfig::new().with_api_base(base),
            None => OpenAIConfig::new(),
        };
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            temperature: 0.5,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

fn to_request_message(msg: &Message) -> Result<ChatCompletionRequestMessage, AgentError> {
    let err = |e: async_openai::error::OpenAIError| AgentError::LlmError(e.to_string());
    let message = match msg.role {
        MessageRole::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(msg.content.as_str())
            .build()
            .map_err(err)?
            .into(),
        MessageRole::User => ChatCompletionRequestUserMessageArgs::default()
            .content(msg.content.as_str())
            .build()
            .map_err(err)?
            .into(),
        MessageRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(msg.content.as_str())
            .build()
            .map_err(err)?
            .into(),
    };
    Ok(message)
}

#[async_trait]
impl ChatModel for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> Result<LlmResponse, AgentError> {
        let start = std::time::Instant::now();

        let mut request_messages = Vec::with_capacity(messages.len() + 1);
        if !system_prompt.is_empty() {
            request_messages.push(to_request_message(&Message::system(system_prompt))?);
        }
        for msg in messages {
            request_messages.push(to_request_message(msg)?);
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .messages(request_messages)
            .build()
            .map_err(|e| AgentError::LlmError(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AgentError::LlmError(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let (input_tokens, output_tokens) = response
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));

        Ok(LlmResponse {
            content,
            metrics: LlmMetrics {
                input_tokens,
                output_tokens,
                elapsed_ms: start.elapsed().as_millis() as u64,
            },
        })
    }
}
