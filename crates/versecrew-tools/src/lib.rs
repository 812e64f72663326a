//! Tool registry and built-in research tools for versecrew.
//!
//! Tools take a single free-text input (whatever the agent wrote after
//! `Action Input:`) and return text the agent reads as an observation.

mod duckduckgo;
mod email;
mod flowise;
mod serper;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use versecrew_core::AgentError;

pub use duckduckgo::{DuckDuckGoSearch, DUCKDUCKGO_BASE};
pub use email::{Mailer, OutgoingEmail, SendGridMailer, SENDGRID_API_BASE};
pub use flowise::{FlowiseQuestion, DEFAULT_FLOWISE_URL};
pub use serper::{SerperPlaces, SerperSearch, SERPER_API_BASE};

/// Number of search hits handed back to the agent.
pub const TOP_RESULTS: usize = 4;

/// A capability an agent can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the agent writes after `Action:`.
    fn name(&self) -> &str;

    /// One-line description shown in the agent prompt.
    fn description(&self) -> &str;

    async fn call(&self, input: &str) -> Result<String, AgentError>;
}

/// Tools available to a crew, looked up by name.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name.trim()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name.trim())
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// `name: description` lines for the given tools, skipping unknown names.
    pub fn describe(&self, names: &[String]) -> String {
        names
            .iter()
            .filter_map(|n| self.tools.get(n))
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Renders up to `limit` search hits as `Title` / `Link` / `Snippet` blocks.
pub fn format_results(results: &Value, limit: usize) -> String {
    let Some(items) = results.as_array() else {
        return String::new();
    };

    let field = |item: &Value, key: &str| -> String {
        match item.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "N/A".to_string(),
            Some(other) => other.to_string(),
        }
    };

    items
        .iter()
        .take(limit)
        .map(|item| {
            [
                format!("Title: {}", field(item, "title")),
                format!("Link: {}", field(item, "link")),
                format!("Snippet: {}", field(item, "snippet")),
                "\n-----------------".to_string(),
            ]
            .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Repeats the input"
        }
        async fn call(&self, input: &str) -> Result<String, AgentError> {
            Ok(input.to_string())
        }
    }

    #[test]
    fn test_format_results_fills_missing_fields() {
        let results = json!([
            {"title": "Bethlehem", "link": "https://example.org/b", "snippet": "A town"},
            {"title": "Nazareth"}
        ]);
        let out = format_results(&results, 4);
        assert_eq!(
            out,
            "Title: Bethlehem\nLink: https://example.org/b\nSnippet: A town\n\n-----------------\n\
             Title: Nazareth\nLink: N/A\nSnippet: N/A\n\n-----------------"
        );
    }

    #[test]
    fn test_format_results_respects_limit() {
        let results = json!([{"title": "a"}, {"title": "b"}, {"title": "c"}]);
        let out = format_results(&results, 1);
        assert!(out.contains("Title: a"));
        assert!(!out.contains("Title: b"));
    }

    #[test]
    fn test_format_results_non_array_is_empty() {
        assert_eq!(format_results(&json!("plain"), 4), "");
        assert_eq!(format_results(&json!({"title": "x"}), 4), "");
    }

    #[tokio::test]
    async fn test_registry_lookup_and_describe() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));

        assert!(registry.contains("echo"));
        assert!(registry.contains(" echo "));
        assert_eq!(registry.names(), vec!["echo"]);
        assert_eq!(
            registry.describe(&["echo".to_string(), "missing".to_string()]),
            "echo: Repeats the input"
        );

        let tool = registry.get(" echo ").unwrap();
        assert_eq!(tool.call("hi").await.unwrap(), "hi");
        assert!(registry.get("missing").is_none());
    }
}
