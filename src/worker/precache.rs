//! Precache loader: fills the current cache with the fixed asset list

use crate::cache::{Cache, CacheStorage};
use crate::config::schema::CacheConfig;
use crate::error::{PrecacheError, PrecacheResult};
use crate::http::Request;
use crate::network::Network;
use futures_util::future::join_all;
use tracing::{debug, info};

/// Populates a named cache with a fixed list of assets
#[derive(Debug, Clone)]
pub struct PrecacheLoader {
    cache_name: String,
    assets: Vec<String>,
}

impl PrecacheLoader {
    /// Create a loader for a cache name and asset list
    pub fn new(cache_name: impl Into<String>, assets: Vec<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
            assets,
        }
    }

    /// Create a loader from the `[cache]` config section
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.name.clone(), config.assets.clone())
    }

    /// Assets this loader stores
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Open the cache and store every asset. Returns the number of entries written.
    pub async fn run(
        &self,
        storage: &dyn CacheStorage,
        network: &dyn Network,
    ) -> PrecacheResult<usize> {
        info!(
            "Caching {} assets into {}",
            self.assets.len(),
            self.cache_name
        );
        let cache = storage.open(&self.cache_name).await?;
        add_all(cache.as_ref(), network, &self.assets).await
    }
}

/// Fetch every URL and store the responses keyed by the URL.
///
/// All fetches complete before anything is written. If any fetch fails or
/// returns a non-2xx status, nothing is stored and the first failure (in list
/// order) is returned.
pub async fn add_all(
    cache: &dyn Cache,
    network: &dyn Network,
    urls: &[String],
) -> PrecacheResult<usize> {
    let fetches = urls.iter().map(|url| async move {
        let response = network
            .fetch(&Request::get(url.clone()))
            .await
            .map_err(|e| PrecacheError::AssetFetch {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        if !response.is_ok() {
            return Err(PrecacheError::AssetFetch {
                url: url.clone(),
                reason: format!("HTTP {} {}", response.status, response.status_text)
                    .trim_end()
                    .to_string(),
            });
        }
        Ok((url, response))
    });

    let responses = join_all(fetches)
        .await
        .into_iter()
        .collect::<PrecacheResult<Vec<_>>>()?;

    let count = responses.len();
    for (url, response) in responses {
        debug!("Storing {} ({} bytes) in {}", url, response.body.len(), cache.name());
        cache.put(url, response).await?;
    }

    Ok(count)
}
