//! # API Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ARENDIR_PORT=8080                                                  │
//! │     ARENDIR_ADVANCE_POLICY=not_rejected                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $ARENDIR_CONFIG, or ./arendir.toml                                 │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8000
//!
//! [database]
//! path = "arendir.db"
//! max_connections = 8
//!
//! [storage]
//! root = "./storage"
//! public_base_url = "http://localhost:8000/files"
//!
//! [sunat]
//! base_url = "https://api.apis.net.pe/v2"
//! token = "..."
//! timeout_secs = 10
//! max_retries = 2
//!
//! [reconciliation]
//! advance_policy = "approved_only"  # approved_only | not_rejected
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use arendir_core::AdvancePolicy;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "ARENDIR_CONFIG";

/// Config file used when `ARENDIR_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "arendir.toml";

/// Configuration failures. All of them stop the process at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Server
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

// =============================================================================
// Database
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file, created on first start.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// How long a writer waits on a locked database before failing.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("arendir.db")
}

fn default_max_connections() -> u32 {
    8
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_busy_timeout() -> u64 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

// =============================================================================
// Object Storage
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory exported reports are written to.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    /// Prefix of the URLs handed back to clients.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./storage")
}

fn default_public_base_url() -> String {
    "http://localhost:8000/files".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            root: default_storage_root(),
            public_base_url: default_public_base_url(),
        }
    }
}

// =============================================================================
// SUNAT
// =============================================================================

/// Tax-authority and exchange-rate API. Without `base_url` the
/// `/consulta/*` routes answer 503.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SunatSettings {
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer token.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_sunat_timeout")]
    pub timeout_secs: u64,

    /// Retries after the first attempt, transient failures only.
    #[serde(default = "default_sunat_retries")]
    pub max_retries: u32,
}

fn default_sunat_timeout() -> u64 {
    10
}

fn default_sunat_retries() -> u32 {
    2
}

impl Default for SunatSettings {
    fn default() -> Self {
        SunatSettings {
            base_url: None,
            token: None,
            timeout_secs: default_sunat_timeout(),
            max_retries: default_sunat_retries(),
        }
    }
}

impl SunatSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationSettings {
    #[serde(default)]
    pub advance_policy: AdvancePolicy,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub sunat: SunatSettings,

    #[serde(default)]
    pub reconciliation: ReconciliationSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else `$ARENDIR_CONFIG`, else `arendir.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = config_path
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Reads a config file, falling back to defaults when it does not exist.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            info!(?path, "Loading config from file");
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            debug!(?path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Writes the configuration as TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.storage.root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("storage.root must not be empty".into()));
        }
        require_http_url("storage.public_base_url", &self.storage.public_base_url)?;
        if let Some(ref url) = self.sunat.base_url {
            require_http_url("sunat.base_url", url)?;
        }
        if self.sunat.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "sunat.timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Applies `ARENDIR_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("ARENDIR_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Some(port) = lookup("ARENDIR_PORT") {
            match port.parse::<u16>() {
                Ok(p) => {
                    debug!(port = p, "Overriding port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(port = %port, "Ignoring invalid ARENDIR_PORT"),
            }
        }

        if let Some(path) = lookup("ARENDIR_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("ARENDIR_DB_MAX_CONNECTIONS") {
            if let Ok(m) = max.parse::<u32>() {
                self.database.max_connections = m;
            }
        }

        if let Some(root) = lookup("ARENDIR_STORAGE_ROOT") {
            self.storage.root = PathBuf::from(root);
        }

        if let Some(url) = lookup("ARENDIR_PUBLIC_BASE_URL") {
            self.storage.public_base_url = url;
        }

        if let Some(url) = lookup("ARENDIR_SUNAT_URL") {
            self.sunat.base_url = Some(url);
        }

        if let Some(token) = lookup("ARENDIR_SUNAT_TOKEN") {
            self.sunat.token = Some(token);
        }

        if let Some(secs) = lookup("ARENDIR_SUNAT_TIMEOUT_SECS") {
            if let Ok(s) = secs.parse::<u64>() {
                self.sunat.timeout_secs = s;
            }
        }

        if let Some(policy) = lookup("ARENDIR_ADVANCE_POLICY") {
            match policy.parse::<AdvancePolicy>() {
                Ok(p) => {
                    debug!(policy = %p, "Overriding advance policy from environment");
                    self.reconciliation.advance_policy = p;
                }
                Err(_) => warn!(policy = %policy, "Unknown advance policy in environment"),
            }
        }
    }
}

fn require_http_url(field: &str, url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{} must start with http:// or https://, got: {}",
            field, url
        )))
    }
}
