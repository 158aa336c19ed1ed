//! CLI command implementations

pub mod activate;
pub mod caches;
pub mod config;
pub mod fetch;
pub mod install;

pub use activate::execute as activate;
pub use caches::execute as caches;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use install::execute as install;

use crate::cache::{CacheStorage, DiskCacheStorage};
use crate::config::{Config, ConfigManager};
use crate::network::{HttpNetwork, Network};
use crate::worker::OfflineWorker;
use std::sync::Arc;

/// Cache storage used by every command
pub(crate) fn storage(config: &Config) -> DiskCacheStorage {
    DiskCacheStorage::new(ConfigManager::caches_dir(config))
}

/// Build the offline worker and the network it shares with its host
pub(crate) fn worker(config: &Config) -> (OfflineWorker, Arc<dyn Network>) {
    let storage: Arc<dyn CacheStorage> = Arc::new(storage(config));
    let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(&config.network));
    let worker = OfflineWorker::new(&config.cache, storage, network.clone());
    (worker, network)
}
