//! Serper (google.serper.dev) web and places search.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};
use versecrew_core::AgentError;

use crate::{format_results, Tool, TOP_RESULTS};

pub const SERPER_API_BASE: &str = "https://google.serper.dev";

#[derive(Clone)]
struct SerperClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl SerperClient {
    fn new(api_key: String) -> Result<Self, AgentError> {
        if api_key.is_empty() {
            return Err(AgentError::ExternalApi("SERPER_API_KEY not configured".into()));
        }
        Ok(Self {
            client: Client::new(),
            api_key,
            api_base: SERPER_API_BASE.to_string(),
        })
    }

    /// Posts `query` to `endpoint`; `Ok(None)` when Serper answers with a non-200 status.
    async fn post(&self, endpoint: &str, query: &str) -> Result<Option<Value>, AgentError> {
        let url = format!("{}/{}", self.api_base, endpoint);
        debug!(%url, query, "serper request");

        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": query }))
            .send()
            .await
            .map_err(|e| AgentError::ExternalApi(e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            warn!(status = %response.status(), endpoint, "serper request failed");
            return Ok(None);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::ExternalApi(e.to_string()))?;
        Ok(Some(body))
    }
}

/// `search_internet`: organic web results.
pub struct SerperSearch {
    inner: SerperClient,
}

impl SerperSearch {
    pub fn new(api_key: impl Into<String>) -> Result<Self, AgentError> {
        Ok(Self { inner: SerperClient::new(api_key.into())? })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.inner.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl Tool for SerperSearch {
    fn name(&self) -> &str {
        "search_internet"
    }

    fn description(&self) -> &str {
        "Search the internet about a given topic and return relevant results."
    }

    async fn call(&self, input: &str) -> Result<String, AgentError> {
        match self.inner.post("search", input).await? {
            Some(body) => Ok(format_results(&body["organic"], TOP_RESULTS)),
            None => Ok("Failed to search the internet.".to_string()),
        }
    }
}

/// `search_places`: places relevant to the geography of a verse.
pub struct SerperPlaces {
    inner: SerperClient,
}

impl SerperPlaces {
    pub fn new(api_key: impl Into<String>) -> Result<Self, AgentError> {
        Ok(Self { inner: SerperClient::new(api_key.into())? })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.inner.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl Tool for SerperPlaces {
    fn name(&self) -> &str {
        "search_places"
    }

    fn description(&self) -> &str {
        "Search for places in the geographical context of a bible verse and return relevant results."
    }

    async fn call(&self, input: &str) -> Result<String, AgentError> {
        match self.inner.post("places", input).await? {
            Some(body) => Ok(format_results(&body["places"], TOP_RESULTS)),
            None => Ok("Failed to search places.".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_requires_api_key() {
        assert!(SerperSearch::new("").is_err());
        assert!(SerperPlaces::new("").is_err());
    }

    #[tokio::test]
    async fn test_search_formats_top_organic_results() {
        let server = MockServer::start();
        let organic: Vec<Value> = (1..=6)
            .map(|i| json!({"title": format!("Result {i}"), "link": format!("https://r{i}.example"), "snippet": "s"}))
            .collect();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/search")
                .header("X-API-KEY", "key")
                .json_body(json!({"q": "John 3:16"}));
            then.status(200).json_body(json!({ "organic": organic }));
        });

        let tool = SerperSearch::new("key").unwrap().with_api_base(server.base_url());
        let out = tool.call("John 3:16").await.unwrap();

        mock.assert();
        assert!(out.contains("Title: Result 4"));
        assert!(!out.contains("Title: Result 5"));
    }

    #[tokio::test]
    async fn test_places_failure_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/places");
            then.status(429);
        });

        let tool = SerperPlaces::new("key").unwrap().with_api_base(server.base_url());
        assert_eq!(tool.call("Jerusalem").await.unwrap(), "Failed to search places.");
    }

    #[tokio::test]
    async fn test_places_reads_places_key() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/places");
            then.status(200).json_body(json!({"places": [{"title": "Golgotha"}]}));
        });

        let tool = SerperPlaces::new("key").unwrap().with_api_base(server.base_url());
        let out = tool.call("crucifixion").await.unwrap();
        assert!(out.starts_with("Title: Golgotha\nLink: N/A"));
    }
}
