//! Worker configuration
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. `BILLING_`-prefixed environment variables, `__` between nested keys
//!    (`BILLING_OUTBOX_DIR`, `BILLING_BILLING__SENDER_CODE`)

use serde::Deserialize;
use std::path::{Path, PathBuf};

use domain_billing::BillingConfig;

/// Worker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Log level filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Directory rendered documents are dropped into
    pub outbox_dir: PathBuf,
    /// PostgreSQL connection string; in-memory ledger and archive when unset
    #[serde(default)]
    pub database_url: Option<String>,
    /// Document generation settings
    #[serde(default)]
    pub billing: BillingConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            outbox_dir: PathBuf::from("outbox"),
            database_url: None,
            billing: BillingConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Loads configuration from environment only
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(None)
    }

    /// Loads configuration from an optional file plus the environment
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let defaults = WorkerConfig::default();
        let mut builder = config::Config::builder()
            .set_default("log_level", defaults.log_level)?
            .set_default("outbox_dir", defaults.outbox_dir.to_string_lossy().into_owned())?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder
            .add_source(
                config::Environment::with_prefix("BILLING")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// True when a database is configured
    pub fn uses_database(&self) -> bool {
        self.database_url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.outbox_dir, PathBuf::from("outbox"));
        assert!(!config.uses_database());
        assert_eq!(config.billing.sender_code, "BROKER");
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
log_level = "debug"
outbox_dir = "/var/spool/billing"

[billing]
sender_code = "VANDEGRIFT"
partner_code = "ACMECORP"
importer_code = "ACME"
"#
        )
        .unwrap();

        let config = WorkerConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.outbox_dir, PathBuf::from("/var/spool/billing"));
        assert_eq!(config.billing.sender_code, "VANDEGRIFT");
        assert_eq!(config.billing.partner_code, "ACMECORP");
        assert_eq!(config.billing.importer_code.as_deref(), Some("ACME"));
        assert_eq!(config.billing.charge_codes.catch_all_code, "C099");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = WorkerConfig::load(Some(Path::new("/nonexistent/billing-worker.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_database_url_means_memory() {
        let config = WorkerConfig {
            database_url: Some("  ".into()),
            ..WorkerConfig::default()
        };
        assert!(!config.uses_database());
    }
}
