//! DuckDuckGo HTML search rendered to plain text.

use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;
use versecrew_core::AgentError;

use crate::Tool;

pub const DUCKDUCKGO_BASE: &str = "https://html.duckduckgo.com";

const USER_AGENT: &str = "Mozilla/5.0 (compatible; versecrew/0.1)";
const TEXT_WIDTH: usize = 100;
const MAX_CHARS: usize = 4000;

/// `duckduckgo_search`: keyless web search.
pub struct DuckDuckGoSearch {
    client: Client,
    base: String,
}

impl DuckDuckGoSearch {
    pub fn new() -> Result<Self, AgentError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AgentError::ExternalApi(format!("DuckDuckGo client: {e}")))?;
        Ok(Self {
            client,
            base: DUCKDUCKGO_BASE.to_string(),
        })
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }
}

fn html_to_text(html: &str) -> Result<String, AgentError> {
    let text = html2text::config::plain()
        .string_from_read(html.as_bytes(), TEXT_WIDTH)
        .map_err(|e| AgentError::ToolFailed(e.to_string()))?;
    Ok(text.chars().take(MAX_CHARS).collect())
}

#[async_trait]
impl Tool for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo_search"
    }

    fn description(&self) -> &str {
        "Search the web with DuckDuckGo. Input is a search query."
    }

    async fn call(&self, input: &str) -> Result<String, AgentError> {
        let response = self
            .client
            .get(format!("{}/html/", self.base))
            .query(&[("q", input)])
            .send()
            .await
            .map_err(|e| AgentError::ExternalApi(e.to_string()))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "duckduckgo search failed");
            return Ok("Failed to search DuckDuckGo.".to_string());
        }

        let html = response
            .text()
            .await
            .map_err(|e| AgentError::ExternalApi(e.to_string()))?;
        html_to_text(&html)
    }
}
