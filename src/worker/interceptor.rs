//! Fetch interceptor: cache first, network on miss

use crate::cache::CacheStorage;
use crate::error::PrecacheResult;
use crate::http::{Request, Response};
use crate::network::Network;
use tracing::{debug, warn};

/// Answers requests from the current cache, falling back to the network.
///
/// Cache open and read failures count as misses. Network responses are
/// returned as-is and never written to the cache.
#[derive(Debug, Clone)]
pub struct FetchInterceptor {
    cache_name: String,
}

impl FetchInterceptor {
    /// Create an interceptor reading from `cache_name`
    pub fn new(cache_name: impl Into<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
        }
    }

    /// Handle one request
    pub async fn handle(
        &self,
        storage: &dyn CacheStorage,
        network: &dyn Network,
        request: &Request,
    ) -> PrecacheResult<Response> {
        match self.lookup(storage, &request.url).await {
            Ok(Some(response)) => {
                debug!("Serving {} from {}", request.url, self.cache_name);
                return Ok(response);
            }
            Ok(None) => debug!("{} not in {}, trying network", request.url, self.cache_name),
            Err(e) if e.is_recovered_by_network() => warn!(
                "Failed to fetch from cache for {}, trying network: {}",
                request.url, e
            ),
            Err(e) => return Err(e),
        }

        network.fetch(request).await
    }

    async fn lookup(
        &self,
        storage: &dyn CacheStorage,
        url: &str,
    ) -> PrecacheResult<Option<Response>> {
        let cache = storage.open(&self.cache_name).await?;
        cache.match_url(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, MemoryCacheStorage};
    use crate::error::PrecacheError;
    use crate::network::StaticNetwork;
    use async_trait::async_trait;

    async fn seeded_storage() -> MemoryCacheStorage {
        let storage = MemoryCacheStorage::new();
        let cache = storage.open("v2").await.unwrap();
        cache
            .put("/a.js", Response::ok("/a.js", "cached"))
            .await
            .unwrap();
        storage
    }

    #[tokio::test]
    async fn hit_skips_network() {
        let storage = seeded_storage().await;
        let network = StaticNetwork::new().route("/a.js", "fresh");

        let res = FetchInterceptor::new("v2")
            .handle(&storage, &network, &Request::get("/a.js"))
            .await
            .unwrap();

        assert_eq!(res.body, b"cached");
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn miss_goes_to_network_once() {
        let storage = seeded_storage().await;
        let served = Response::ok("/b.js", "fresh").with_header("ETag", "\"abc\"");
        let network = StaticNetwork::new().respond("/b.js", served.clone());

        let res = FetchInterceptor::new("v2")
            .handle(&storage, &network, &Request::get("/b.js"))
            .await
            .unwrap();

        assert_eq!(res, served);
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn miss_is_not_written_back() {
        let storage = seeded_storage().await;
        let network = StaticNetwork::new().route("/b.js", "fresh");
        let interceptor = FetchInterceptor::new("v2");

        interceptor
            .handle(&storage, &network, &Request::get("/b.js"))
            .await
            .unwrap();
        interceptor
            .handle(&storage, &network, &Request::get("/b.js"))
            .await
            .unwrap();

        assert_eq!(network.calls(), 2);
        let cache = storage.open("v2").await.unwrap();
        assert!(cache.match_url("/b.js").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn other_caches_are_ignored() {
        let storage = MemoryCacheStorage::new();
        let old = storage.open("v1").await.unwrap();
        old.put("/a.js", Response::ok("/a.js", "stale")).await.unwrap();
        let network = StaticNetwork::new().route("/a.js", "fresh");

        let res = FetchInterceptor::new("v2")
            .handle(&storage, &network, &Request::get("/a.js"))
            .await
            .unwrap();

        assert_eq!(res.body, b"fresh");
    }

    #[tokio::test]
    async fn network_error_propagates() {
        let storage = MemoryCacheStorage::new();
        let network = StaticNetwork::new().offline("/b.js");

        let err = FetchInterceptor::new("v2")
            .handle(&storage, &network, &Request::get("/b.js"))
            .await
            .unwrap_err();

        assert!(matches!(err, PrecacheError::Network { .. }));
    }

    /// Storage whose `open` always fails with the given error
    struct BrokenStorage(fn(&str) -> PrecacheError);

    fn quota_exceeded(name: &str) -> PrecacheError {
        PrecacheError::CacheOpen {
            name: name.to_string(),
            reason: "quota exceeded".to_string(),
        }
    }

    fn lost_task(_name: &str) -> PrecacheError {
        PrecacheError::Internal("storage task panicked".to_string())
    }

    #[async_trait]
    impl CacheStorage for BrokenStorage {
        async fn open(&self, name: &str) -> PrecacheResult<Box<dyn Cache>> {
            Err((self.0)(name))
        }

        async fn keys(&self) -> PrecacheResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn delete(&self, _name: &str) -> PrecacheResult<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn store_failure_falls_back_to_network() {
        let network = StaticNetwork::new().route("/a.js", "fresh");

        let res = FetchInterceptor::new("v2")
            .handle(&BrokenStorage(quota_exceeded), &network, &Request::get("/a.js"))
            .await
            .unwrap();

        assert_eq!(res.body, b"fresh");
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn unexpected_store_error_propagates() {
        let network = StaticNetwork::new().route("/a.js", "fresh");

        let err = FetchInterceptor::new("v2")
            .handle(&BrokenStorage(lost_task), &network, &Request::get("/a.js"))
            .await
            .unwrap_err();

        assert!(matches!(err, PrecacheError::Internal(_)));
        assert_eq!(network.calls(), 0);
    }
}
