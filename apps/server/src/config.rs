//! # Server Configuration
//!
//! ## Load Order (later overrides earlier)
//! 1. Default values
//! 2. Config file (`inventario.toml`)
//! 3. Environment variables
//!
//! ```text
//! ┌───────────────────────────┬────────────────────────────────────────────┐
//! │ Environment variable      │ Overrides                                  │
//! ├───────────────────────────┼────────────────────────────────────────────┤
//! │ INVENTARIO_CONFIG         │ config file path                           │
//! │ INVENTARIO_DB_PATH        │ [database] path                            │
//! │ INVENTARIO_BIND_ADDR      │ [server] bind_addr                         │
//! │ INVENTARIO_PORT           │ [server] port                              │
//! │ INVENTARIO_SCANNER_BAUD   │ [scanner] baud                             │
//! │ INVENTARIO_AUDIT_RETRIES  │ [audit] max_retries                        │
//! └───────────────────────────┴────────────────────────────────────────────┘
//! ```
//!
//! When no path is given the file is looked up in the platform config
//! directory (`~/.config/inventario/inventario.toml` on Linux).

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use inventario_db::DbConfig;
use inventario_scanner::{PortSettings, DEFAULT_BAUD};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Default HTTP port; the forwarder assumes it.
pub const DEFAULT_PORT: u16 = 5000;

/// Config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "inventario.toml";

// =============================================================================
// Errors
// =============================================================================

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[server]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// `[database]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: PathBuf::from("inventario.db"),
            max_connections: 8,
            busy_timeout_ms: 4000,
        }
    }
}

/// `[scanner]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    pub baud: u32,
    pub read_timeout_ms: u64,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        ScannerSettings {
            baud: DEFAULT_BAUD,
            read_timeout_ms: 1000,
        }
    }
}

/// `[audit]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for AuditSettings {
    fn default() -> Self {
        AuditSettings {
            max_retries: 5,
            retry_delay_ms: 120,
        }
    }
}

// =============================================================================
// ServerConfig
// =============================================================================

/// Complete server configuration.
///
/// ## Example inventario.toml
/// ```toml
/// [server]
/// bind_addr = "0.0.0.0"
/// port = 5000
///
/// [database]
/// path = "/srv/inventario/inventario.db"
///
/// [scanner]
/// baud = 9600
///
/// [audit]
/// max_retries = 5
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub scanner: ScannerSettings,
    pub audit: AuditSettings,
}

impl ServerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// `path` wins over `INVENTARIO_CONFIG`, which wins over the platform
    /// config directory. A missing file is not an error.
    pub fn load(path: Option<PathBuf>) -> ConfigResult<Self> {
        let path = path
            .or_else(|| std::env::var_os("INVENTARIO_CONFIG").map(PathBuf::from))
            .or_else(Self::default_config_path);

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file, falling back to defaults when it does not exist.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        info!(path = %path.display(), "Loading config file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Applies overrides read through `lookup` (the process environment in
    /// production).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("INVENTARIO_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(addr) = lookup("INVENTARIO_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Some(port) = lookup("INVENTARIO_PORT") {
            self.server.port = parse_var("INVENTARIO_PORT", &port)?;
        }

        if let Some(baud) = lookup("INVENTARIO_SCANNER_BAUD") {
            self.scanner.baud = parse_var("INVENTARIO_SCANNER_BAUD", &baud)?;
        }

        if let Some(retries) = lookup("INVENTARIO_AUDIT_RETRIES") {
            self.audit.max_retries = parse_var("INVENTARIO_AUDIT_RETRIES", &retries)?;
        }

        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired("database.path".into()));
        }
        if self.server.bind_addr.parse::<IpAddr>().is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "server.bind_addr '{}'",
                self.server.bind_addr
            )));
        }
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue("server.port".into()));
        }
        if self.scanner.baud == 0 {
            return Err(ConfigError::InvalidValue("scanner.baud".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue("database.max_connections".into()));
        }
        Ok(())
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "inventario", "inventario")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    /// `host:port` to bind the listener to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind_addr, self.server.port)
    }

    /// Pool settings for [`inventario_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
            .audit_retries(
                self.audit.max_retries,
                Duration::from_millis(self.audit.retry_delay_ms),
            )
    }

    /// How the scanner worker opens its port.
    pub fn port_settings(&self) -> PortSettings {
        PortSettings {
            baud: self.scanner.baud,
            read_timeout: Duration::from_millis(self.scanner.read_timeout_ms),
            ..PortSettings::default()
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}
