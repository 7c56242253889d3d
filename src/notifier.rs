//! Buyer and low-stock notifications.

use std::sync::Arc;

use tracing::{info, warn};

use crate::mail::{Email, MailTransport};
use crate::settings::{SettingsService, CODE_PLACEHOLDER};

/// Subject of the buyer email.
pub const BUYER_SUBJECT: &str = "Il tuo codice E-learning è pronto!";

/// Subject of the administrator low-stock alert.
pub const LOW_STOCK_SUBJECT: &str = "Attenzione: Codici Monouso in esaurimento";

/// Substitute the issued code into a buyer template.
pub fn render_buyer_message(template: &str, code: &str) -> String {
    template.replace(CODE_PLACEHOLDER, code)
}

/// Body of the low-stock alert.
pub fn low_stock_message(remaining: u64) -> String {
    format!(
        "La lista dei codici monouso sta per terminare. Sono rimasti solo {remaining} codici. \
         Si prega di caricare una nuova lista."
    )
}

/// Sends buyer and administrator mail. Delivery failures are logged, never returned.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn MailTransport>,
    settings: SettingsService,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn MailTransport>, settings: SettingsService) -> Self {
        Self { mailer, settings }
    }

    /// Email the issued code to the buyer using the stored template.
    ///
    /// An unreadable template falls back to the built-in one.
    pub async fn notify_buyer(&self, to: &str, code: &str) {
        let template = self.settings.email_template().await;
        let body = render_buyer_message(&template, code);
        self.send(Email::html(to, BUYER_SUBJECT, body)).await;
    }

    /// Alert the administrator when `remaining` is exactly `threshold`.
    ///
    /// Any other count, including one below the threshold, sends nothing.
    /// Returns whether an alert was sent.
    pub async fn maybe_notify_low_stock(&self, remaining: u64, threshold: u32, to: &str) -> bool {
        if remaining != u64::from(threshold) {
            return false;
        }
        info!(remaining, threshold, to, "codes running low");
        self.send(Email::html(to, LOW_STOCK_SUBJECT, low_stock_message(remaining)))
            .await;
        true
    }

    async fn send(&self, email: Email) {
        let to = email.to.clone();
        let subject = email.subject.clone();
        if let Err(e) = self.mailer.send(email).await {
            warn!(to = %to, subject = %subject, error = %e, "failed to send mail");
        }
    }
}
