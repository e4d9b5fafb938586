//! Configuration for rights-core
//!
//! Ledger connection, HTTP server and linked-data settings. Loaded from a
//! TOML file and then overridden by environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::entity::DEFAULT_CONTEXT;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "RIGHTS_CONFIG";
/// Environment override for `server.addr`
pub const ADDR_ENV: &str = "RIGHTS_ADDR";
/// Environment override for `ledger.url`
pub const LEDGER_URL_ENV: &str = "RIGHTS_LEDGER_URL";

/// System-wide configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RightsConfig {
    /// Ledger backend settings
    pub ledger: LedgerConfig,
    /// HTTP server settings
    pub server: ServerConfig,
    /// Emitted document settings
    pub linked_data: LinkedDataConfig,
}

/// Ledger backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// `memory://`, `sqlite::memory:` or `sqlite://<path>`
    pub url: String,
    /// How long a write waits on a locked database before timing out
    pub busy_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            url: "memory://".to_string(),
            busy_timeout_ms: 5_000,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub addr: String,
    /// Upper bound on a single engine call
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

/// Linked-data output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkedDataConfig {
    /// `@context` of every emitted document
    pub context: String,
}

impl Default for LinkedDataConfig {
    fn default() -> Self {
        Self {
            context: DEFAULT_CONTEXT.to_string(),
        }
    }
}

impl RightsConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// `<config dir>/rights-ledger/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rights-ledger").join("config.toml"))
    }

    /// Read and validate a TOML config file
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml(&contents)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `$RIGHTS_CONFIG`, else the default path if it exists, else
    /// defaults; then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load_from_path(Path::new(&path))?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load_from_path(&path)?,
                None => Self::default(),
            },
        };

        config.apply_overrides(
            std::env::var(ADDR_ENV).ok(),
            std::env::var(LEDGER_URL_ENV).ok(),
        );
        config.validate()?;
        Ok(config)
    }

    /// Replace the listen address and ledger url when given
    pub fn apply_overrides(&mut self, addr: Option<String>, ledger_url: Option<String>) {
        if let Some(addr) = addr.filter(|a| !a.trim().is_empty()) {
            self.server.addr = addr;
        }
        if let Some(url) = ledger_url.filter(|u| !u.trim().is_empty()) {
            self.ledger.url = url;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.url.trim().is_empty() {
            return Err(ConfigError::MissingField("ledger.url".to_string()));
        }

        if self.server.addr.trim().is_empty() {
            return Err(ConfigError::MissingField("server.addr".to_string()));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::OutOfRange(
                "server.request_timeout_ms must be positive".to_string(),
            ));
        }

        if self.linked_data.context.trim().is_empty() {
            return Err(ConfigError::MissingField(
                "linked_data.context".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration loading or validation error
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Config file could not be read
    Io(String),
    /// Config file is not valid TOML for this schema
    Parse(String),
    /// Value is out of valid range
    OutOfRange(String),
    /// Required field is missing or empty
    MissingField(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Cannot read config: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Invalid config: {}", msg),
            ConfigError::OutOfRange(msg) => write!(f, "Value out of range: {}", msg),
            ConfigError::MissingField(msg) => write!(f, "Missing field: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
