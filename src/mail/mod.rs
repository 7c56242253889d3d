//! Outbound mail.
//!
//! The `MailTransport` trait is the seam to whatever actually delivers
//! messages. Delivery is best-effort: callers on the order path log a
//! failed send and carry on.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

mod log;
#[cfg(any(test, feature = "test-utils"))]
mod mock;
mod relay;

pub use self::log::LogMailTransport;
#[cfg(any(test, feature = "test-utils"))]
pub use self::mock::MockMailTransport;
pub use self::relay::{HttpMailConfig, HttpMailTransport};

/// Errors that can occur while handing a message to a transport.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail relay rejected message: status {status}")]
    Rejected { status: u16 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

/// Body content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Html,
    Plain,
}

impl ContentType {
    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Html => "text/html; charset=UTF-8",
            ContentType::Plain => "text/plain; charset=UTF-8",
        }
    }
}

/// A single outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub content_type: ContentType,
}

impl Email {
    /// An HTML message.
    pub fn html(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            content_type: ContentType::Html,
        }
    }
}

/// Interface for mail delivery.
///
/// Implementations:
/// - `LogMailTransport`: writes messages to the log (local development)
/// - `HttpMailTransport`: posts messages to an HTTP mail relay
/// - `MockMailTransport`: records messages for tests
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Hand one message to the transport. No delivery confirmation.
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Transport type discriminator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransportType {
    #[default]
    Log,
    Http,
}

/// Mail configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Transport type discriminator.
    #[serde(rename = "type")]
    pub transport_type: MailTransportType,
    /// HTTP relay configuration.
    pub http: HttpMailConfig,
}

/// Build the configured mail transport.
pub fn init_mail(config: &MailConfig) -> Result<Arc<dyn MailTransport>, MailError> {
    match config.transport_type {
        MailTransportType::Log => {
            info!("Mail: log transport");
            Ok(Arc::new(LogMailTransport::new()))
        }
        MailTransportType::Http => {
            info!(endpoint = %config.http.endpoint, "Mail: HTTP relay transport");
            Ok(Arc::new(HttpMailTransport::new(config.http.clone())?))
        }
    }
}
