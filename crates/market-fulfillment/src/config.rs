//! # Back-Office Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MARKET_DB_PATH=./market.db                                         │
//! │     MARKET_SMTP_HOST=mail.local                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/market/market.toml (Linux)                               │
//! │     ~/Library/Application Support/com.market.backoffice/market.toml    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     ./market.db, SMTP on localhost:1025, ./exports/orders              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "./market.db"
//! max_connections = 5
//!
//! [mail]
//! smtp_host = "localhost"
//! smtp_port = 1025
//! from_address = "orders@market.local"
//! timeout_secs = 10
//!
//! [fulfillment]
//! export_dir = "./exports/orders"
//! step_timeout_secs = 10
//! resend_batch_size = 50
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use market_db::DbConfig;

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./market.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Mail Settings
// =============================================================================

/// SMTP relay used for order confirmations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailSettings {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// AUTH is skipped when unset.
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_from_address")]
    pub from_address: String,

    /// Connection and command timeout in seconds.
    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    1025
}

fn default_from_address() -> String {
    "orders@market.local".to_string()
}

fn default_mail_timeout() -> u64 {
    10
}

impl Default for MailSettings {
    fn default() -> Self {
        MailSettings {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            from_address: default_from_address(),
            timeout_secs: default_mail_timeout(),
        }
    }
}

impl MailSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Fulfillment Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentSettings {
    /// Where confirmation PDFs are written.
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// Bound on each storage or mail call.
    #[serde(default = "default_step_timeout")]
    pub step_timeout_secs: u64,

    /// Outbox entries retried per `resend` run.
    #[serde(default = "default_resend_batch_size")]
    pub resend_batch_size: u32,
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("./exports/orders")
}

fn default_step_timeout() -> u64 {
    10
}

fn default_resend_batch_size() -> u32 {
    50
}

impl Default for FulfillmentSettings {
    fn default() -> Self {
        FulfillmentSettings {
            export_dir: default_export_dir(),
            step_timeout_secs: default_step_timeout(),
            resend_batch_size: default_resend_batch_size(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete back-office configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub mail: MailSettings,

    #[serde(default)]
    pub fulfillment: FulfillmentSettings,
}

impl MarketConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (market.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let explicit = config_path.is_some();
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else if explicit {
                return Err(ConfigError::Invalid(format!(
                    "config file not found: {}",
                    path.display()
                )));
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides_from(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Applies `MARKET_*` overrides read through `lookup`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("MARKET_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(dir) = lookup("MARKET_EXPORT_DIR") {
            self.fulfillment.export_dir = PathBuf::from(dir);
        }

        if let Some(host) = lookup("MARKET_SMTP_HOST") {
            debug!(host = %host, "Overriding SMTP host from environment");
            self.mail.smtp_host = host;
        }

        if let Some(port) = lookup("MARKET_SMTP_PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.mail.smtp_port = p,
                Err(_) => warn!(port = %port, "Ignoring invalid MARKET_SMTP_PORT"),
            }
        }

        if let Some(username) = lookup("MARKET_SMTP_USERNAME") {
            self.mail.username = Some(username);
        }

        if let Some(password) = lookup("MARKET_SMTP_PASSWORD") {
            self.mail.password = Some(password);
        }

        if let Some(from) = lookup("MARKET_MAIL_FROM") {
            self.mail.from_address = from;
        }

        if let Some(secs) = lookup("MARKET_STEP_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.fulfillment.step_timeout_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid MARKET_STEP_TIMEOUT_SECS"),
            }
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.mail.smtp_host.trim().is_empty() {
            return Err(ConfigError::Invalid("mail.smtp_host must not be empty".into()));
        }

        if !self.mail.from_address.contains('@') {
            return Err(ConfigError::Invalid(format!(
                "mail.from_address is not an address: {}",
                self.mail.from_address
            )));
        }

        if self.fulfillment.step_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "fulfillment.step_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.fulfillment.resend_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "fulfillment.resend_batch_size must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "market", "backoffice")
            .map(|dirs| dirs.config_dir().join("market.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn db_config(&self) -> DbConfig {
        if self.database.path.as_os_str() == ":memory:" {
            // One connection per in-memory database
            return DbConfig::in_memory();
        }
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.fulfillment.step_timeout_secs)
    }
}
