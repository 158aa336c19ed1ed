//! The offline worker script
//!
//! Wires the three components to the lifecycle events:
//!
//! | Event | Component | Effect |
//! |-------|-----------|--------|
//! | install | [`PrecacheLoader`] | store every configured asset |
//! | activate | [`CacheJanitor`] | delete caches with another name |
//! | fetch | [`FetchInterceptor`] | cache first, network on miss |

pub mod interceptor;
pub mod janitor;
pub mod precache;

pub use interceptor::FetchInterceptor;
pub use janitor::CacheJanitor;
pub use precache::{add_all, PrecacheLoader};

use crate::cache::CacheStorage;
use crate::config::schema::CacheConfig;
use crate::events::{ExtendableEvent, FetchEvent};
use crate::network::Network;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Handlers a host dispatches lifecycle and fetch events to
pub trait WorkerScript: Send + Sync {
    /// Called once when the worker is installed
    fn on_install(&self, event: &mut ExtendableEvent);

    /// Called once when the worker becomes active
    fn on_activate(&self, event: &mut ExtendableEvent);

    /// Called for every intercepted request
    fn on_fetch(&self, event: &mut FetchEvent);
}

/// Worker that precaches a fixed asset list and serves it cache-first
#[derive(Clone)]
pub struct OfflineWorker {
    loader: Arc<PrecacheLoader>,
    janitor: Arc<CacheJanitor>,
    interceptor: Arc<FetchInterceptor>,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
}

impl OfflineWorker {
    /// Create a worker for the `[cache]` config section
    pub fn new(
        config: &CacheConfig,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
    ) -> Self {
        Self {
            loader: Arc::new(PrecacheLoader::from_config(config)),
            janitor: Arc::new(CacheJanitor::new(config.name.clone())),
            interceptor: Arc::new(FetchInterceptor::new(config.name.clone())),
            storage,
            network,
        }
    }

    /// Name of the current cache
    pub fn cache_name(&self) -> &str {
        self.janitor.current()
    }
}

impl WorkerScript for OfflineWorker {
    fn on_install(&self, event: &mut ExtendableEvent) {
        info!("Caching your assets...");
        let loader = self.loader.clone();
        let storage = self.storage.clone();
        let network = self.network.clone();
        event.wait_until(async move {
            let written = loader.run(storage.as_ref(), network.as_ref()).await?;
            debug!("Precached {} asset(s)", written);
            Ok(())
        });
    }

    fn on_activate(&self, event: &mut ExtendableEvent) {
        info!("Deleting stale caches...");
        let janitor = self.janitor.clone();
        let storage = self.storage.clone();
        event.wait_until(async move {
            let deleted = janitor.run(storage.as_ref()).await?;
            if !deleted.is_empty() {
                info!("Deleted stale caches: {}", deleted.join(", "));
            }
            Ok(())
        });
    }

    fn on_fetch(&self, event: &mut FetchEvent) {
        debug!("Fetching {}", event.request().url);
        let interceptor = self.interceptor.clone();
        let storage = self.storage.clone();
        let network = self.network.clone();
        let request = event.request().clone();
        let registered = event.respond_with(async move {
            interceptor
                .handle(storage.as_ref(), network.as_ref(), &request)
                .await
        });
        if let Err(e) = registered {
            warn!("{}", e);
        }
    }
}
