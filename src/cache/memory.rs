//! In-process cache storage

use super::{Cache, CacheStorage};
use crate::error::PrecacheResult;
use crate::http::Response;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Entries = Arc<RwLock<BTreeMap<String, Response>>>;

/// Cache storage kept entirely in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryCacheStorage {
    caches: Arc<RwLock<BTreeMap<String, Entries>>>,
}

impl MemoryCacheStorage {
    /// Create empty storage
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> PrecacheResult<Box<dyn Cache>> {
        let mut caches = self.caches.write().await;
        let entries = caches.entry(name.to_string()).or_default().clone();
        Ok(Box::new(MemoryCache {
            name: name.to_string(),
            entries,
        }))
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        Ok(self.caches.read().await.keys().cloned().collect())
    }

    async fn has(&self, name: &str) -> PrecacheResult<bool> {
        Ok(self.caches.read().await.contains_key(name))
    }

    async fn delete(&self, name: &str) -> PrecacheResult<bool> {
        Ok(self.caches.write().await.remove(name).is_some())
    }
}

/// Handle to one in-memory cache.
///
/// The handle stays usable after its cache is deleted from storage, but writes
/// through it are no longer visible to new `open` calls.
struct MemoryCache {
    name: String,
    entries: Entries,
}

#[async_trait]
impl Cache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_url(&self, url: &str) -> PrecacheResult<Option<Response>> {
        Ok(self.entries.read().await.get(url).cloned())
    }

    async fn put(&self, url: &str, response: Response) -> PrecacheResult<()> {
        self.entries.write().await.insert(url.to_string(), response);
        Ok(())
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}
