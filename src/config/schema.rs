//! Configuration schema for precache
//!
//! Configuration is stored at `~/.config/precache/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Cache name used when none is configured. The trailing ordinal is the version.
pub const DEFAULT_CACHE_NAME: &str = "pico8-game-cache-v2";

/// Assets precached when none are configured
pub const DEFAULT_ASSETS: &[&str] = &[
    "/app.js",
    "/index.html",
    "/app.css",
    "/jelpi.js",
    "/manifest.json",
    "/images/icon_128x128.png",
    "/images/icon_144x144.png",
    "/images/icon_152x152.png",
    "/images/icon_192x192.png",
    "/images/icon_256x256.png",
    "/images/icon_32x32.png",
    "/images/icon_512x512.png",
    "/images/pico8_logo_vector.png",
    "/images/rotate.gif",
];

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache name and precache list
    pub cache: CacheConfig,

    /// Network settings
    pub network: NetworkConfig,

    /// Worker lifecycle settings
    pub worker: WorkerConfig,

    /// On-disk storage settings
    pub storage: StorageConfig,
}

impl Config {
    /// Check the values that cannot be expressed in the schema.
    ///
    /// Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache.name.trim().is_empty() {
            return Err("cache.name must not be empty".to_string());
        }
        if self.network.origin.trim().is_empty() {
            return Err("network.origin must not be empty".to_string());
        }
        if !is_absolute_url(&self.network.origin) {
            return Err(format!(
                "network.origin must be an http(s) URL, got {:?}",
                self.network.origin
            ));
        }
        if let Some(asset) = self
            .cache
            .assets
            .iter()
            .find(|a| !a.starts_with('/') && !is_absolute_url(a))
        {
            return Err(format!(
                "cache.assets entry {:?} must start with '/' or be an http(s) URL",
                asset
            ));
        }
        Ok(())
    }
}

/// Whether a string is an absolute http or https URL
pub fn is_absolute_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Name of the current cache; every other cache is stale
    pub name: String,

    /// Paths (or absolute URLs) stored during install, in order
    pub assets: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CACHE_NAME.to_string(),
            assets: DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Origin that relative asset paths are resolved against
    pub origin: String,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".to_string(),
            user_agent: format!("precache/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Worker lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Activate immediately after a successful install
    pub skip_waiting: bool,

    /// Take control of clients once activated
    pub claim_clients: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            skip_waiting: true,
            claim_clients: true,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the cache stores (defaults to the state dir)
    pub dir: Option<PathBuf>,
}
