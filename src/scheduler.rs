//! Recurring report schedule.
//!
//! The report task is registered lazily: the first `ensure_scheduled` call
//! spawns it and fires the first report immediately, later calls are no-ops.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::report::WeeklyReporter;

/// One week.
pub const DEFAULT_REPORT_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Report schedule configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Seconds between reports.
    pub interval_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_REPORT_INTERVAL_SECS,
        }
    }
}

/// Capability to register the recurring report.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Register the recurring task unless it already is. Returns whether
    /// this call registered it.
    async fn ensure_scheduled(&self) -> bool;
}

/// Tokio-backed report schedule.
pub struct ReportScheduler {
    reporter: WeeklyReporter,
    interval: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReportScheduler {
    pub fn new(reporter: WeeklyReporter, config: &ReportConfig) -> Self {
        Self {
            reporter,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            handle: Mutex::new(None),
        }
    }

    /// Set a custom interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Whether the recurring task is registered.
    pub async fn is_scheduled(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// Send one report now (manual invocation or external cron).
    pub async fn run_once(&self) -> crate::storage::Result<usize> {
        self.reporter.send_report().await
    }

    /// Abort the recurring task, if any.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
            info!("report schedule stopped");
        }
    }
}

#[async_trait]
impl Scheduler for ReportScheduler {
    async fn ensure_scheduled(&self) -> bool {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return false;
        }

        let reporter = self.reporter.clone();
        let period = self.interval;
        let next = chrono::Utc::now()
            + chrono::Duration::from_std(period).unwrap_or_else(|_| chrono::Duration::weeks(1));
        info!(
            interval_secs = period.as_secs(),
            following_run = %next.to_rfc3339(),
            "report scheduled"
        );

        *handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                if let Err(e) = reporter.send_report().await {
                    warn!(error = %e, "scheduled report failed");
                }
            }
        }));
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mail::MockMailTransport;
    use crate::report::EMPTY_REPORT_MESSAGE;
    use crate::settings::{SettingsDefaults, SettingsService};
    use crate::storage::{MockCodeStore, MockSettingsStore};

    fn scheduler(interval: Duration) -> (ReportScheduler, Arc<MockMailTransport>) {
        let mailer = Arc::new(MockMailTransport::new());
        let settings = SettingsService::new(
            Arc::new(MockSettingsStore::new()),
            SettingsDefaults::default(),
        );
        let reporter = WeeklyReporter::new(Arc::new(MockCodeStore::new()), settings, mailer.clone());
        (
            ReportScheduler::new(reporter, &ReportConfig::default()).with_interval(interval),
            mailer,
        )
    }

    #[test]
    fn test_default_interval_is_one_week() {
        assert_eq!(ReportConfig::default().interval_secs, 604_800);
    }

    #[tokio::test]
    async fn test_ensure_scheduled_is_idempotent() {
        let (scheduler, _mailer) = scheduler(Duration::from_secs(3600));

        assert!(!scheduler.is_scheduled().await);
        assert!(scheduler.ensure_scheduled().await);
        assert!(!scheduler.ensure_scheduled().await);
        assert!(scheduler.is_scheduled().await);

        scheduler.shutdown().await;
        assert!(!scheduler.is_scheduled().await);
    }

    #[tokio::test]
    async fn test_first_report_fires_on_registration() {
        let (scheduler, mailer) = scheduler(Duration::from_secs(3600));
        scheduler.ensure_scheduled().await;

        for _ in 0..50 {
            if !mailer.sent().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, EMPTY_REPORT_MESSAGE);
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_run_once_sends_without_scheduling() {
        let (scheduler, mailer) = scheduler(Duration::from_secs(3600));
        assert_eq!(scheduler.run_once().await.unwrap(), 0);
        assert_eq!(mailer.sent().await.len(), 1);
        assert!(!scheduler.is_scheduled().await);
    }
}
