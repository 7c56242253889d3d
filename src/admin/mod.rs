//! Administrative actions.
//!
//! Every action checks the caller's privilege first. These are the only
//! writers of the settings store and the only way codes enter the pool.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::model::{CodeRecord, RedeemedCode};
use crate::settings::{Settings, SettingsService};
use crate::storage::{CodeStore, StorageError};

pub mod import;
pub mod rest;

pub use import::{parse_codes, ImportError};

/// Errors from administrative actions.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Permission denied")]
    PermissionDenied,

    #[error("Upload failed: {0}")]
    UploadFailed(#[from] ImportError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub can_manage: bool,
}

impl Caller {
    pub fn administrator() -> Self {
        Self { can_manage: true }
    }

    pub fn anonymous() -> Self {
        Self { can_manage: false }
    }

    fn require_manage(&self) -> Result<(), AdminError> {
        if self.can_manage {
            Ok(())
        } else {
            warn!("administrative action denied");
            Err(AdminError::PermissionDenied)
        }
    }
}

/// Everything the management page shows.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub available: Vec<CodeRecord>,
    pub redeemed: Vec<RedeemedCode>,
    pub settings: Settings,
}

/// Keep a plausible address, or store nothing so mail falls back to the
/// system administrative address.
fn sanitize_email(raw: &str) -> String {
    let email = raw.trim();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && domain.contains('.')
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace) =>
        {
            email.to_string()
        }
        _ => String::new(),
    }
}

/// Administrative operations over the code and settings stores.
#[derive(Clone)]
pub struct AdminService {
    codes: Arc<dyn CodeStore>,
    settings: SettingsService,
}

impl AdminService {
    pub fn new(codes: Arc<dyn CodeStore>, settings: SettingsService) -> Self {
        Self { codes, settings }
    }

    pub async fn overview(&self, caller: &Caller) -> Result<Overview, AdminError> {
        caller.require_manage()?;
        Ok(Overview {
            available: self.codes.list_available().await?,
            redeemed: self.codes.list_redeemed().await?,
            settings: self.settings.load().await,
        })
    }

    pub async fn save_email_template(&self, caller: &Caller, template: &str) -> Result<(), AdminError> {
        caller.require_manage()?;
        self.settings.save_email_template(template).await?;
        info!("email template saved");
        Ok(())
    }

    /// Invalid addresses are stored as empty.
    pub async fn save_notification_email(&self, caller: &Caller, email: &str) -> Result<String, AdminError> {
        caller.require_manage()?;
        let email = sanitize_email(email);
        self.settings.save_notification_email(&email).await?;
        info!(email = %email, "notification email saved");
        Ok(email)
    }

    pub async fn save_notification_threshold(&self, caller: &Caller, threshold: i64) -> Result<u32, AdminError> {
        caller.require_manage()?;
        let stored = self.settings.save_notification_threshold(threshold).await?;
        info!(threshold = stored, "notification threshold saved");
        Ok(stored)
    }

    /// Parse a CSV upload and add every row to the pool. Returns rows added.
    pub async fn import_csv(&self, caller: &Caller, data: &[u8]) -> Result<u64, AdminError> {
        caller.require_manage()?;
        let codes = parse_codes(data)?;
        let inserted = self.codes.insert_many(codes).await?;
        info!(inserted, "imported codes");
        Ok(inserted)
    }

    /// Clear the available pool. Redeemed codes are kept.
    pub async fn delete_all_codes(&self, caller: &Caller) -> Result<u64, AdminError> {
        caller.require_manage()?;
        let deleted = self.codes.delete_all_available().await?;
        info!(deleted, "cleared available codes");
        Ok(deleted)
    }

    pub async fn delete_code(&self, caller: &Caller, id: i64) -> Result<bool, AdminError> {
        caller.require_manage()?;
        let deleted = self.codes.delete_available(id).await?;
        info!(id, deleted, "deleted code");
        Ok(deleted)
    }
}
