//! Result delivery over email.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::info;
use versecrew_core::AgentError;

pub const SENDGRID_API_BASE: &str = "https://api.sendgrid.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Sends finished crew results to the address submitted with the verse.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AgentError>;
}

pub struct SendGridMailer {
    client: Client,
    api_key: String,
    from_email: String,
    api_base: String,
}

impl SendGridMailer {
    pub fn new(api_key: impl Into<String>, from_email: impl Into<String>) -> Result<Self, AgentError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(AgentError::ExternalApi("SENDGRID_API_KEY not configured".into()));
        }
        Ok(Self {
            client: Client::new(),
            api_key,
            from_email: from_email.into(),
            api_base: SENDGRID_API_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AgentError> {
        let payload = json!({
            "personalizations": [{ "to": [{ "email": email.to }] }],
            "from": { "email": self.from_email },
            "subject": email.subject,
            "content": [{ "type": "text/plain", "value": email.body }]
        });

        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AgentError::ExternalApi(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::ExternalApi(format!("SendGrid error {}: {}", status, body)));
        }

        info!(to = %email.to, "result email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn sample() -> OutgoingEmail {
        OutgoingEmail {
            to: "reader@example.com".into(),
            subject: "Your verse study".into(),
            body: "Article text".into(),
        }
    }

    #[tokio::test]
    async fn test_send_posts_sendgrid_payload() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v3/mail/send")
                .header("authorization", "Bearer sg-key")
                .json_body(json!({
                    "personalizations": [{ "to": [{ "email": "reader@example.com" }] }],
                    "from": { "email": "noreply@example.com" },
                    "subject": "Your verse study",
                    "content": [{ "type": "text/plain", "value": "Article text" }]
                }));
            then.status(202);
        });

        let mailer = SendGridMailer::new("sg-key", "noreply@example.com")
            .unwrap()
            .with_api_base(server.base_url());
        mailer.send(&sample()).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_send_reports_rejection() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v3/mail/send");
            then.status(401).body("unauthorized");
        });

        let mailer = SendGridMailer::new("k", "from@example.com")
            .unwrap()
            .with_api_base(server.base_url());
        let err = mailer.send(&sample()).await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_requires_api_key() {
        assert!(SendGridMailer::new("", "from@example.com").is_err());
    }
}
