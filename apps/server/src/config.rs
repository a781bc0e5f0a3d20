//! # Server Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STRAND_PORT=9000                                                   │
//! │     STRAND_DB_PATH=/var/lib/strand/strand.db                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, or STRAND_CONFIG, or                              │
//! │     ~/.config/strand/server.toml (Linux)                               │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "/var/lib/strand/strand.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [catalog]
//! short_code_prefix = "M"
//! max_code_attempts = 50
//!
//! [[fulfillment.shipping_rates]]
//! delivery_method = "PICKUP_POINT"
//! czk = 8900
//! eur = 390
//!
//! [notifications]
//! enabled = true
//! queue_capacity = 256
//! ```

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strand_core::{CatalogSettings, FulfillmentSettings};
use strand_db::DbConfig;
use thiserror::Error;
use tracing::{debug, info, warn};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// Where the HTTP listener binds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl HttpSettings {
    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bad bind address {}:{}", self.bind_addr, self.port)))
    }
}

/// SQLite store settings, turned into a [`DbConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. Defaults to the platform data directory.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// How long a unit of work waits for the write lock.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("cz", "strand", "strand")
        .map(|dirs| dirs.data_dir().join("strand.db"))
        .unwrap_or_else(|| PathBuf::from("./strand.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl DatabaseSettings {
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.path)
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }
}

/// Post-commit order confirmations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Confirmations waiting for the worker before new ones are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for NotificationSettings {
    fn default() -> Self {
        NotificationSettings {
            enabled: true,
            queue_capacity: default_queue_capacity(),
        }
    }
}

// =============================================================================
// Server Config
// =============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub fulfillment: FulfillmentSettings,

    #[serde(default)]
    pub notifications: NotificationSettings,
}

impl ServerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, `STRAND_CONFIG`, platform config dir)
    /// 3. `STRAND_*` environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var("STRAND_CONFIG").ok().map(PathBuf::from))
            .or_else(Self::default_config_path);

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading server config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Applies `STRAND_*` overrides read through `var`.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = var("STRAND_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Some(port) = var("STRAND_PORT") {
            match port.parse() {
                Ok(p) => {
                    debug!(port = p, "Overriding port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(value = %port, "Ignoring invalid STRAND_PORT"),
            }
        }

        if let Some(path) = var("STRAND_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = var("STRAND_DB_MAX_CONNECTIONS") {
            match max.parse() {
                Ok(m) => self.database.max_connections = m,
                Err(_) => warn!(value = %max, "Ignoring invalid STRAND_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(timeout) = var("STRAND_DB_BUSY_TIMEOUT_MS") {
            match timeout.parse() {
                Ok(t) => self.database.busy_timeout_ms = t,
                Err(_) => warn!(value = %timeout, "Ignoring invalid STRAND_DB_BUSY_TIMEOUT_MS"),
            }
        }

        if let Some(prefix) = var("STRAND_SHORT_CODE_PREFIX") {
            self.catalog.short_code_prefix = prefix;
        }

        if let Some(enabled) = var("STRAND_NOTIFICATIONS_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.notifications.enabled = true,
                "0" | "false" | "no" | "off" => self.notifications.enabled = false,
                _ => warn!(value = %enabled, "Ignoring invalid STRAND_NOTIFICATIONS_ENABLED"),
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.server.socket_addr()?;

        let db = &self.database;
        if db.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be greater than 0".into()));
        }
        if db.min_connections > db.max_connections {
            return Err(ConfigError::Invalid(
                "database.min_connections cannot exceed max_connections".into(),
            ));
        }

        let catalog = &self.catalog;
        if catalog.short_code_prefix.is_empty()
            || !catalog.short_code_prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ConfigError::Invalid(
                "catalog.short_code_prefix must be non-empty ASCII letters or digits".into(),
            ));
        }
        if catalog.max_code_attempts == 0 {
            return Err(ConfigError::Invalid("catalog.max_code_attempts must be greater than 0".into()));
        }
        if catalog.default_min_order_grams <= 0 || catalog.default_step_grams <= 0 {
            return Err(ConfigError::Invalid(
                "catalog default min-order and step grams must be positive".into(),
            ));
        }

        let mut methods = HashSet::new();
        for rate in &self.fulfillment.shipping_rates {
            if rate.czk.is_negative() || rate.eur.is_negative() {
                return Err(ConfigError::Invalid(format!(
                    "shipping rate for {:?} cannot be negative",
                    rate.delivery_method
                )));
            }
            if !methods.insert(rate.delivery_method) {
                return Err(ConfigError::Invalid(format!(
                    "shipping rate for {:?} listed twice",
                    rate.delivery_method
                )));
            }
        }
        if self.fulfillment.max_order_lines == 0 {
            return Err(ConfigError::Invalid("fulfillment.max_order_lines must be greater than 0".into()));
        }

        if self.notifications.queue_capacity == 0 {
            return Err(ConfigError::Invalid("notifications.queue_capacity must be greater than 0".into()));
        }

        Ok(())
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("cz", "strand", "strand").map(|dirs| dirs.config_dir().join("server.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use strand_core::{DeliveryMethod, Money};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.catalog.short_code_prefix, "M");
        assert!(config.notifications.enabled);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [catalog]
            short_code_prefix = "S"

            [[fulfillment.shipping_rates]]
            delivery_method = "COURIER"
            czk = 12900
            eur = 550
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_addr, "127.0.0.1");
        assert_eq!(config.catalog.short_code_prefix, "S");
        assert_eq!(config.catalog.max_code_attempts, 50);
        assert_eq!(config.fulfillment.shipping_rates.len(), 1);
        assert_eq!(
            config.fulfillment.shipping_cost(DeliveryMethod::Courier, strand_core::Currency::Czk),
            Some(Money::from_minor(12900))
        );
        assert_eq!(config.database.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServerConfig::default();
        config.apply_overrides(env(&[
            ("STRAND_PORT", "9100"),
            ("STRAND_DB_PATH", "/tmp/strand-test.db"),
            ("STRAND_NOTIFICATIONS_ENABLED", "off"),
            ("STRAND_DB_MAX_CONNECTIONS", "many"),
        ]));

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.database.path, PathBuf::from("/tmp/strand-test.db"));
        assert!(!config.notifications.enabled);
        // Unparseable values leave the previous setting
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::default();
        config.catalog.short_code_prefix = "M-".to_string();
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.database.min_connections = 10;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        let duplicate = config.fulfillment.shipping_rates[0];
        config.fulfillment.shipping_rates.push(duplicate);
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.server.bind_addr = "not an address".to_string();
        assert!(config.validate().is_err());
    }
}
