//! Activate command - delete caches left by earlier versions

use crate::cache::CacheStorage;
use crate::config::Config;
use crate::error::{PrecacheError, PrecacheResult};
use crate::host::{WorkerHost, WorkerState};
use crate::ui::{self, UiContext};
use tracing::debug;

/// Execute the activate command
pub async fn execute(config: &Config) -> PrecacheResult<()> {
    let ctx = UiContext::detect();

    let storage = super::storage(config);

    // Without an installed cache the janitor would leave nothing to serve from
    if !storage.has(&config.cache.name).await? {
        return Err(PrecacheError::InvalidState {
            action: "activate",
            state: WorkerState::Parsed,
        });
    }

    let (worker, network) = super::worker(config);
    let host = WorkerHost::resume_installed(worker, config.worker.clone(), network);

    let before = storage.keys().await?;
    debug!("Caches before activation: {:?}", before);

    host.activate().await?;

    let after = storage.keys().await?;
    let removed: Vec<&String> = before.iter().filter(|n| !after.contains(n)).collect();

    if removed.is_empty() {
        ui::step_ok(&ctx, "No stale caches");
    } else {
        for name in removed {
            ui::step_ok_detail(&ctx, "Deleted stale cache", name);
        }
    }
    ui::key_value(&ctx, "current", &config.cache.name);

    Ok(())
}
