//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

mod server;

pub use server::{AdminConfig, ServerConfig};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "CODICI_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "CODICI";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "CODICI_LOG";

use serde::Deserialize;

use crate::mail::MailConfig;
use crate::orders::CommerceConfig;
use crate::scheduler::ReportConfig;
use crate::settings::SettingsDefaults;
use crate::storage::StorageConfig;

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// REST server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Mail transport configuration.
    pub mail: MailConfig,
    /// Commerce platform configuration.
    pub commerce: CommerceConfig,
    /// Administrative access.
    pub admin: AdminConfig,
    /// Report schedule.
    pub report: ReportConfig,
    /// Install-time settings defaults.
    pub defaults: SettingsDefaults,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix, `__` separated
    ///    (e.g. `CODICI__STORAGE__PATH`)
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        Ok(config)
    }

    /// Create config for testing: in-memory storage, log mail, no commerce
    /// API, fixed admin and hook tokens.
    pub fn for_test() -> Self {
        let mut config = Self::default();
        config.storage.storage_type = crate::storage::StorageType::Memory;
        config.admin.token = Some("test-token".to_string());
        config.commerce.hook_token = Some("hook-token".to_string());
        config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::mail::MailTransportType;
    use crate::storage::StorageType;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.port, 8090);
        assert_eq!(config.storage.storage_type, StorageType::Sqlite);
        assert_eq!(config.mail.transport_type, MailTransportType::Log);
        assert_eq!(config.defaults.notification_threshold, 2);
        assert_eq!(config.commerce.qualifying_category, "e-learning");
        assert!(config.commerce.endpoint.is_empty());
        assert!(config.commerce.hook_token.is_none());
        assert_eq!(config.report.interval_secs, 604_800);
        assert!(config.admin.token.is_none());
    }

    #[test]
    fn test_config_for_test() {
        let config = Config::for_test();
        assert_eq!(config.storage.storage_type, StorageType::Memory);
        assert_eq!(config.admin.token.as_deref(), Some("test-token"));
    }

    #[test]
    #[serial_test::serial]
    fn test_load_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "storage:\n  type: memory\nmail:\n  type: http\n  http:\n    endpoint: http://relay.local/send\ndefaults:\n  notification_threshold: 5\n  admin_email: root@example.com"
        )
        .unwrap();

        let config = Config::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.storage.storage_type, StorageType::Memory);
        assert_eq!(config.mail.transport_type, MailTransportType::Http);
        assert_eq!(config.mail.http.endpoint, "http://relay.local/send");
        assert_eq!(config.defaults.notification_threshold, 5);
        assert_eq!(config.defaults.admin_email, "root@example.com");
        assert_eq!(config.server.port, 8090);
    }

    #[test]
    #[serial_test::serial]
    fn test_env_overrides() {
        std::env::set_var("CODICI__SERVER__PORT", "9999");
        std::env::set_var("CODICI__ADMIN__TOKEN", "s3cret");
        let config = Config::load(None);
        std::env::remove_var("CODICI__SERVER__PORT");
        std::env::remove_var("CODICI__ADMIN__TOKEN");

        let config = config.unwrap();
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.admin.token.as_deref(), Some("s3cret"));
    }
}
