//! Log-only mail transport.

use async_trait::async_trait;
use tracing::info;

use super::{Email, MailError, MailTransport};

/// Writes every message to the log instead of delivering it.
#[derive(Debug, Default)]
pub struct LogMailTransport;

impl LogMailTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MailTransport for LogMailTransport {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        info!(
            to = %email.to,
            subject = %email.subject,
            content_type = email.content_type.mime(),
            body = %email.body,
            "mail"
        );
        Ok(())
    }
}
