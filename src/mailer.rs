//! Email dispatch over an HTTP mail API
//!
//! Screening reports go out through a JSON mail endpoint; delivery
//! outcomes are recorded by the detection engine

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::config::MailConfig;

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Mail API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

/// One outgoing report email
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Transport used to deliver report emails
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailerError>;
}

/// Mail API client
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: String,
    from_address: String,
}

impl HttpMailer {
    /// Create a new mailer from the configured credentials
    pub fn new(config: &MailConfig) -> Result<Self, MailerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for HttpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailerError> {
        let request = SendRequest {
            from: &self.from_address,
            to: &message.to,
            subject: &message.subject,
            text: &message.text,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(MailerError::RateLimitExceeded);
            }

            error!("Mail API rejected message: {} - {}", status, text);
            return Err(MailerError::Api(format!("{}: {}", status, text)));
        }

        info!("Report email sent to {}", message.to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn test_config(url: String) -> MailConfig {
        MailConfig {
            api_url: url,
            api_key: "secret".to_string(),
            from_address: "reports@parkinsense.test".to_string(),
        }
    }

    fn test_message() -> MailMessage {
        MailMessage {
            to: "patient@example.com".to_string(),
            subject: "Parkinson Detection Report".to_string(),
            text: "All clear.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/send")
                .header("authorization", "Bearer secret")
                .json_body_partial(r#"{"to": "patient@example.com"}"#);
            then.status(200)
                .json_body(serde_json::json!({"id": "msg-1"}));
        });

        let mailer = HttpMailer::new(&test_config(server.url("/send"))).unwrap();
        mailer.send(&test_message()).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_send_failure_maps_to_api_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/send");
            then.status(502).body("bad gateway");
        });

        let mailer = HttpMailer::new(&test_config(server.url("/send"))).unwrap();
        let err = mailer.send(&test_message()).await.unwrap_err();
        assert!(matches!(err, MailerError::Api(_)));
    }

    #[tokio::test]
    async fn test_rate_limit_is_distinguished() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/send");
            then.status(429).body("slow down");
        });

        let mailer = HttpMailer::new(&test_config(server.url("/send"))).unwrap();
        let err = mailer.send(&test_message()).await.unwrap_err();
        assert!(matches!(err, MailerError::RateLimitExceeded));
    }
}
