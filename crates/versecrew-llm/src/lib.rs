//! LLM provider clients for versecrew.
//!
//! [`UnifiedLlmClient`] picks a provider from the model name and is what
//! the server hands to the crew engine.

mod gemini;
mod openai;
mod unified;

pub use gemini::{GeminiClient, GEMINI_API_BASE};
pub use openai::OpenAiClient;
pub use unified::{ProviderType, UnifiedLlmClient};
