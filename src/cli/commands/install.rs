//! Install command - precache assets and (by default) activate

use crate::cli::args::InstallArgs;
use crate::config::Config;
use crate::error::PrecacheResult;
use crate::host::{WorkerHost, WorkerState};
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the install command
pub async fn execute(args: InstallArgs, config: &Config) -> PrecacheResult<()> {
    let ctx = UiContext::detect();

    let mut options = config.worker.clone();
    if args.no_activate {
        options.skip_waiting = false;
    }

    let (worker, network) = super::worker(config);
    let host = WorkerHost::new(worker, options, network);

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!(
        "Caching {} assets from {} into {}",
        config.cache.assets.len(),
        config.network.origin,
        config.cache.name
    ));

    match host.install().await {
        Ok(WorkerState::Activated) => {
            spinner.stop(&format!("Installed and activated {}", config.cache.name));
            if host.controls_clients() {
                ui::step_info(&ctx, "Worker controls its clients");
            }
        }
        Ok(state) => {
            spinner.stop(&format!("Installed {}", config.cache.name));
            ui::step_warn_hint(
                &ctx,
                &format!("Worker is {}", state),
                "Run: precache activate",
            );
        }
        Err(e) => {
            spinner.stop_error("Install failed");
            return Err(e);
        }
    }

    Ok(())
}
