//! Configuration loading
//!
//! Bootstrap configuration comes from a TOML file with built-in defaults for
//! every field. Resolution priority, highest first:
//! 1. Command-line arguments (applied by the binary)
//! 2. Environment variables (`FRD_*`)
//! 3. TOML configuration file
//! 4. Compiled defaults
//!
//! A missing file at the default location is not an error: the service starts
//! with defaults and reports it through [`ConfigSource::log`] once logging is
//! up. A missing file that was named explicitly is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default HTTP port for frd-ingest
pub const DEFAULT_PORT: u16 = 5730;

pub const ENV_HOSTAWAY_BASE_URL: &str = "FRD_HOSTAWAY_BASE_URL";
pub const ENV_HOSTAWAY_CLIENT_ID: &str = "FRD_HOSTAWAY_CLIENT_ID";
pub const ENV_HOSTAWAY_CLIENT_SECRET: &str = "FRD_HOSTAWAY_CLIENT_SECRET";
pub const ENV_PLACES_API_KEY: &str = "FRD_PLACES_API_KEY";
pub const ENV_APPROVALS_DATABASE: &str = "FRD_APPROVALS_DATABASE";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub upstream: UpstreamConfig,
    pub hostaway: HostawayConfig,
    pub places: PlacesConfig,
    pub approvals: ApprovalsConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Settings shared by every outbound call
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self { timeout_secs: 8 }
    }
}

/// Primary review/listing provider
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HostawayConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    /// When set, access tokens survive restarts in this JSON file
    pub token_cache_path: Option<PathBuf>,
}

impl Default for HostawayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.hostaway.com/v1".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            scope: "general".to_string(),
            token_cache_path: None,
        }
    }
}

/// A listing whose place reviews are merged into every review query
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlaceSource {
    pub place_id: String,
    pub listing_name: String,
}

/// Alternate review channel
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlacesConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub cache_ttl_secs: u64,
    pub sources: Vec<PlaceSource>,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api/place".to_string(),
            api_key: None,
            cache_ttl_secs: 24 * 60 * 60,
            sources: Vec::new(),
        }
    }
}

/// Moderation decision storage
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ApprovalsConfig {
    /// SQLite database file; in-memory storage when unset
    pub database_path: Option<PathBuf>,
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// Built-in defaults; the default location, when known, had no file
    Defaults(Option<PathBuf>),
}

impl ConfigSource {
    /// Report the source; call after the tracing subscriber is installed
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Configuration loaded from {}", path.display()),
            ConfigSource::Defaults(Some(path)) => warn!(
                "No config file at {}, using built-in defaults",
                path.display()
            ),
            ConfigSource::Defaults(None) => {
                warn!("Could not determine config directory, using built-in defaults")
            }
        }
    }
}

impl TomlConfig {
    /// Default configuration file location (`<config_dir>/flex-reviews/frd-ingest.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("flex-reviews").join("frd-ingest.toml"))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from `explicit`, or from the default location
    ///
    /// Nothing is logged here; the returned [`ConfigSource`] says where the
    /// configuration came from.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Self::load_file(path)
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_file(&path),
                default => Ok((Self::default(), ConfigSource::Defaults(default))),
            },
        }
    }

    fn load_file(path: &Path) -> Result<(Self, ConfigSource)> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        let config = Self::from_toml_str(&content)?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }

    /// Apply `FRD_*` environment overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    ///
    /// Empty or whitespace-only values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_HOSTAWAY_BASE_URL) {
            self.hostaway.base_url = url;
        }
        if let Some(id) = get(ENV_HOSTAWAY_CLIENT_ID) {
            self.hostaway.client_id = id;
        }
        if let Some(secret) = get(ENV_HOSTAWAY_CLIENT_SECRET) {
            self.hostaway.client_secret = secret;
        }
        if let Some(key) = get(ENV_PLACES_API_KEY) {
            self.places.api_key = Some(key);
        }
        if let Some(db) = get(ENV_APPROVALS_DATABASE) {
            self.approvals.database_path = Some(PathBuf::from(db));
        }
    }

    /// Alternate-channel API key, if one is usable
    pub fn places_api_key(&self) -> Option<&str> {
        self.places
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}
