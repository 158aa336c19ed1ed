//! Named response caches
//!
//! A [`CacheStorage`] holds any number of named [`Cache`]s. Each cache maps a
//! request URL, compared verbatim, to a stored [`Response`].
//!
//! # Backends
//!
//! | Backend | Lifetime | Use |
//! |---------|----------|-----|
//! | [`MemoryCacheStorage`] | process | tests, embedding |
//! | [`DiskCacheStorage`] | until deleted | CLI host |

pub mod disk;
pub mod memory;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;

use crate::error::PrecacheResult;
use crate::http::Response;
use async_trait::async_trait;

/// A single named cache
#[async_trait]
pub trait Cache: Send + Sync {
    /// The name this cache was opened under
    fn name(&self) -> &str;

    /// Look up the response stored for `url`
    async fn match_url(&self, url: &str) -> PrecacheResult<Option<Response>>;

    /// Store `response` under `url`, replacing any previous entry
    async fn put(&self, url: &str, response: Response) -> PrecacheResult<()>;

    /// All stored URLs
    async fn keys(&self) -> PrecacheResult<Vec<String>>;
}

/// The set of named caches visible to a worker
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a cache, creating it if it does not exist
    async fn open(&self, name: &str) -> PrecacheResult<Box<dyn Cache>>;

    /// Names of all existing caches
    async fn keys(&self) -> PrecacheResult<Vec<String>>;

    /// Whether a cache with this name exists
    async fn has(&self, name: &str) -> PrecacheResult<bool> {
        Ok(self.keys().await?.iter().any(|k| k == name))
    }

    /// Delete a cache. Returns `false` if it did not exist.
    async fn delete(&self, name: &str) -> PrecacheResult<bool>;
}
