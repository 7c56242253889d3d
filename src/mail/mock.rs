//! Recording mail transport for tests.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Email, MailError, MailTransport};

/// Records every message it is asked to send.
#[derive(Default)]
pub struct MockMailTransport {
    sent: RwLock<Vec<Email>>,
    fail_on_send: RwLock<bool>,
}

impl MockMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_send(&self, fail: bool) {
        *self.fail_on_send.write().await = fail;
    }

    /// All messages sent so far, in order.
    pub async fn sent(&self) -> Vec<Email> {
        self.sent.read().await.clone()
    }

    /// Messages sent to one address.
    pub async fn sent_to(&self, to: &str) -> Vec<Email> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|e| e.to == to)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MailTransport for MockMailTransport {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if *self.fail_on_send.read().await {
            return Err(MailError::Unavailable("send failed".to_string()));
        }
        self.sent.write().await.push(email);
        Ok(())
    }
}
