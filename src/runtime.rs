//! Component wiring.
//!
//! Builds every component from a `Config` and the injected seams (stores,
//! mail transport, order source). Binaries call `Runtime::init`; tests call
//! `Runtime::from_parts` with mocks.

use std::sync::Arc;

use tracing::{info, warn};

use crate::admin::rest::AppState;
use crate::admin::AdminService;
use crate::allocator::Allocator;
use crate::config::Config;
use crate::mail::{init_mail, MailError, MailTransport};
use crate::notifier::Notifier;
use crate::orders::{CodeIssuer, HttpOrderSource, InMemoryOrderSource, OrderError, OrderSource};
use crate::report::WeeklyReporter;
use crate::scheduler::ReportScheduler;
use crate::settings::SettingsService;
use crate::storage::{init_storage, StorageError, Stores};

/// Errors while assembling the runtime.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Commerce error: {0}")]
    Order(#[from] OrderError),
}

/// Fully wired components.
pub struct Runtime {
    pub config: Config,
    pub stores: Stores,
    pub settings: SettingsService,
    pub issuer: Arc<CodeIssuer>,
    pub reporter: WeeklyReporter,
    pub scheduler: Arc<ReportScheduler>,
    pub admin: AdminService,
}

impl Runtime {
    /// Build from configuration: open storage, create the schema, install
    /// default settings, and connect the mail and commerce clients.
    pub async fn init(config: Config) -> Result<Self, RuntimeError> {
        let stores = init_storage(&config.storage).await?;
        let mailer = init_mail(&config.mail)?;
        let orders: Arc<dyn OrderSource> = if config.commerce.endpoint.is_empty() {
            warn!("commerce.endpoint not set; completed orders will not be found");
            Arc::new(InMemoryOrderSource::new())
        } else {
            Arc::new(HttpOrderSource::new(config.commerce.clone())?)
        };

        let runtime = Self::from_parts(config, stores, mailer, orders);
        runtime.settings.install_defaults().await?;
        info!("runtime ready");
        Ok(runtime)
    }

    /// Wire components around already-built seams.
    pub fn from_parts(
        config: Config,
        stores: Stores,
        mailer: Arc<dyn MailTransport>,
        orders: Arc<dyn OrderSource>,
    ) -> Self {
        let settings = SettingsService::new(stores.settings.clone(), config.defaults.clone());
        let allocator = Allocator::new(stores.codes.clone());
        let notifier = Notifier::new(mailer.clone(), settings.clone());

        let issuer = Arc::new(CodeIssuer::new(
            orders,
            allocator,
            notifier,
            settings.clone(),
            config.commerce.qualifying_category.clone(),
        ));
        let reporter = WeeklyReporter::new(stores.codes.clone(), settings.clone(), mailer);
        let scheduler = Arc::new(ReportScheduler::new(reporter.clone(), &config.report));
        let admin = AdminService::new(stores.codes.clone(), settings.clone());

        Self {
            config,
            stores,
            settings,
            issuer,
            reporter,
            scheduler,
            admin,
        }
    }

    /// State for the REST router.
    pub fn app_state(&self) -> AppState {
        AppState {
            admin: self.admin.clone(),
            orders: self.issuer.clone(),
            scheduler: self.scheduler.clone(),
            admin_token: self.config.admin.token.clone(),
            hook_token: self.config.commerce.hook_token.clone(),
        }
    }
}
