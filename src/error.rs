//! Error types for precache
//!
//! All modules use `PrecacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

use crate::host::WorkerState;

/// Result type alias for precache operations
pub type PrecacheResult<T> = Result<T, PrecacheError>;

/// All errors that can occur in precache
#[derive(Error, Debug)]
pub enum PrecacheError {
    // Precache errors
    #[error("Failed to precache {url}: {reason}")]
    AssetFetch { url: String, reason: String },

    // Cache store errors
    #[error("Failed to open cache {name}: {reason}")]
    CacheOpen { name: String, reason: String },

    #[error("Failed to read {url} from cache {name}: {reason}")]
    CacheRead {
        name: String,
        url: String,
        reason: String,
    },

    #[error("Failed to write {url} to cache {name}: {reason}")]
    CacheWrite {
        name: String,
        url: String,
        reason: String,
    },

    #[error("Failed to delete cache {name}: {reason}")]
    CacheDelete { name: String, reason: String },

    // Network errors
    #[error("Network request for {url} failed: {reason}")]
    Network { url: String, reason: String },

    // Lifecycle errors
    #[error("Cannot {action} while worker is {state}")]
    InvalidState {
        action: &'static str,
        state: WorkerState,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PrecacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network error for a URL
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the fetch interceptor recovers from this error by going to the network
    pub fn is_recovered_by_network(&self) -> bool {
        matches!(self, Self::CacheOpen { .. } | Self::CacheRead { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::AssetFetch { .. } => {
                Some("Check that [network] origin serves every path in [cache] assets")
            }
            Self::Network { .. } => Some("Check that the origin server is reachable"),
            Self::InvalidState { .. } => Some("Run: precache install"),
            Self::ConfigInvalid { .. } => Some("Run: precache config show"),
            _ => None,
        }
    }
}
