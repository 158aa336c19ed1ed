//! Cache janitor: removes every cache except the current one

use crate::cache::CacheStorage;
use crate::error::{PrecacheError, PrecacheResult};
use futures_util::future::join_all;
use tracing::{debug, info, warn};

/// Deletes caches left behind by earlier deployments
#[derive(Debug, Clone)]
pub struct CacheJanitor {
    current: String,
}

impl CacheJanitor {
    /// Create a janitor that keeps only `current`
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: current.into(),
        }
    }

    /// Name of the cache that survives
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Delete every stale cache and return the names that were removed.
    ///
    /// Deletions run concurrently. Every deletion is attempted; if any fails,
    /// the first failure in listing order is returned once all have settled.
    pub async fn run(&self, storage: &dyn CacheStorage) -> PrecacheResult<Vec<String>> {
        let stale: Vec<String> = storage
            .keys()
            .await?
            .into_iter()
            .filter(|name| name != &self.current)
            .collect();

        if stale.is_empty() {
            debug!("No stale caches besides {}", self.current);
            return Ok(Vec::new());
        }

        info!("Deleting {} stale cache(s)", stale.len());
        let results = join_all(stale.iter().map(|name| async move {
            (name, storage.delete(name).await)
        }))
        .await;

        let mut deleted = Vec::new();
        let mut first_error = None;
        for (name, result) in results {
            match result {
                Ok(true) => {
                    debug!("Deleted stale cache {}", name);
                    deleted.push(name.clone());
                }
                Ok(false) => debug!("Stale cache {} was already gone", name),
                Err(e) => {
                    warn!("Failed to delete stale cache {}: {}", name, e);
                    first_error.get_or_insert(match e {
                        PrecacheError::CacheDelete { .. } => e,
                        other => PrecacheError::CacheDelete {
                            name: name.clone(),
                            reason: other.to_string(),
                        },
                    });
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(deleted),
        }
    }
}
