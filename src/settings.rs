//! Typed view over the settings store.
//!
//! Three keys are persisted: the buyer email template, the administrator
//! notification address and the low-stock threshold. Missing or unreadable
//! values fall back to `SettingsDefaults`, which come from configuration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::storage::{self, SettingsStore};

/// Placeholder replaced by the issued code in the buyer template.
pub const CODE_PLACEHOLDER: &str = "{{codice}}";

/// Built-in buyer template, used when none is stored or it cannot be read.
pub const DEFAULT_EMAIL_TEMPLATE: &str =
    "Grazie per il tuo ordine! Ecco il tuo codice: {{codice}}";

/// Default low-stock threshold.
pub const DEFAULT_NOTIFICATION_THRESHOLD: u32 = 2;

pub const KEY_EMAIL_TEMPLATE: &str = "email_template";
pub const KEY_NOTIFICATION_EMAIL: &str = "notification_email";
pub const KEY_NOTIFICATION_THRESHOLD: &str = "notification_threshold";

/// Install-time defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettingsDefaults {
    /// Buyer email template.
    pub email_template: String,
    /// Remaining-code count at which the low-stock alert fires.
    pub notification_threshold: u32,
    /// System administrative address. Default notification destination and
    /// fallback whenever the stored notification address is empty.
    pub admin_email: String,
}

impl Default for SettingsDefaults {
    fn default() -> Self {
        Self {
            email_template: DEFAULT_EMAIL_TEMPLATE.to_string(),
            notification_threshold: DEFAULT_NOTIFICATION_THRESHOLD,
            admin_email: "admin@localhost".to_string(),
        }
    }
}

/// Current settings, as read on each allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub email_template: String,
    pub notification_email: String,
    pub notification_threshold: u32,
}

impl Settings {
    /// Address for administrative mail: the configured notification
    /// address, or the system administrative address when it is empty.
    pub fn admin_destination<'a>(&'a self, defaults: &'a SettingsDefaults) -> &'a str {
        if self.notification_email.trim().is_empty() {
            &defaults.admin_email
        } else {
            &self.notification_email
        }
    }
}

/// Read a submitted threshold the way an integer cast reads a string:
/// leading whitespace, optional sign, then as many digits as follow.
/// Anything unreadable is 0; out-of-range values saturate.
pub fn parse_threshold_input(raw: &str) -> i64 {
    let rest = raw.trim_start();
    let (negative, rest) = match rest.as_bytes().first() {
        Some(b'-') => (true, &rest[1..]),
        Some(b'+') => (false, &rest[1..]),
        _ => (false, rest),
    };

    let mut value: i64 = 0;
    for digit in rest.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(digit - b'0');
        value = value.saturating_mul(10).saturating_add(digit);
    }
    if negative {
        -value
    } else {
        value
    }
}

/// Reads and writes settings through a `SettingsStore`.
#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn SettingsStore>,
    defaults: SettingsDefaults,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingsStore>, defaults: SettingsDefaults) -> Self {
        Self { store, defaults }
    }

    pub fn defaults(&self) -> &SettingsDefaults {
        &self.defaults
    }

    /// Write each default only where no value is stored yet.
    pub async fn install_defaults(&self) -> storage::Result<()> {
        let threshold = self.defaults.notification_threshold.to_string();
        for (key, value) in [
            (KEY_EMAIL_TEMPLATE, self.defaults.email_template.as_str()),
            (KEY_NOTIFICATION_EMAIL, self.defaults.admin_email.as_str()),
            (KEY_NOTIFICATION_THRESHOLD, threshold.as_str()),
        ] {
            if self.store.put_if_absent(key, value).await? {
                info!(key, "installed default setting");
            }
        }
        Ok(())
    }

    /// Load all settings, falling back to defaults per key.
    ///
    /// Never fails: a store error is logged and the default used.
    pub async fn load(&self) -> Settings {
        Settings {
            email_template: self.email_template().await,
            notification_email: self
                .read(KEY_NOTIFICATION_EMAIL)
                .await
                .unwrap_or_else(|| self.defaults.admin_email.clone()),
            notification_threshold: self.notification_threshold().await,
        }
    }

    pub async fn email_template(&self) -> String {
        self.read(KEY_EMAIL_TEMPLATE)
            .await
            .unwrap_or_else(|| self.defaults.email_template.clone())
    }

    pub async fn notification_threshold(&self) -> u32 {
        match self.read(KEY_NOTIFICATION_THRESHOLD).await {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = %raw, "stored notification threshold is not a number");
                self.defaults.notification_threshold
            }),
            None => self.defaults.notification_threshold,
        }
    }

    pub async fn save_email_template(&self, template: &str) -> storage::Result<()> {
        self.store.put(KEY_EMAIL_TEMPLATE, template).await
    }

    pub async fn save_notification_email(&self, email: &str) -> storage::Result<()> {
        self.store.put(KEY_NOTIFICATION_EMAIL, email.trim()).await
    }

    /// Negative thresholds are stored as 0.
    pub async fn save_notification_threshold(&self, threshold: i64) -> storage::Result<u32> {
        let threshold = u32::try_from(threshold.max(0)).unwrap_or(u32::MAX);
        self.store
            .put(KEY_NOTIFICATION_THRESHOLD, &threshold.to_string())
            .await?;
        Ok(threshold)
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "failed to read setting, using default");
                None
            }
        }
    }
}
