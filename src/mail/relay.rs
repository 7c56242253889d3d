//! HTTP mail relay transport.
//!
//! POSTs each message as JSON to a relay endpoint:
//! `{"from", "to", "subject", "body", "content_type"}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{ContentType, Email, MailError, MailTransport};

/// HTTP relay configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpMailConfig {
    /// Relay endpoint URL.
    pub endpoint: String,
    /// Sender address.
    pub from: String,
    /// Optional bearer token for the relay.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpMailConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            from: "noreply@localhost".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl HttpMailConfig {
    /// Set the endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
    content_type: ContentType,
}

/// Mail transport backed by an HTTP relay. One attempt per message.
pub struct HttpMailTransport {
    client: Client,
    config: HttpMailConfig,
}

impl HttpMailTransport {
    /// Create a new relay transport with the given configuration.
    pub fn new(config: HttpMailConfig) -> Result<Self, MailError> {
        if config.endpoint.is_empty() {
            return Err(MailError::Config(
                "mail relay endpoint not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let message = RelayMessage {
            from: &self.config.from,
            to: &email.to,
            subject: &email.subject,
            body: &email.body,
            content_type: email.content_type,
        };

        let mut request = self.client.post(&self.config.endpoint).json(&message);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            debug!(to = %email.to, subject = %email.subject, "mail handed to relay");
            Ok(())
        } else {
            error!(to = %email.to, status = status.as_u16(), "mail relay rejected message");
            Err(MailError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}
