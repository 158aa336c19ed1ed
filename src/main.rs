//! precache - offline caching agent
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use precache::cli::{Cli, Commands};
use precache::config::{Config, ConfigManager};
use precache::error::PrecacheResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, config: &Config) {
    // 0 = warn, 1 = info, 2+ = debug
    let filter = match verbose {
        0 => EnvFilter::new("precache=warn"),
        1 => EnvFilter::new("precache=info"),
        _ => EnvFilter::new("precache=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .init();
    }
}

async fn run() -> PrecacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);
    debug!(
        "Using config {} (cache {})",
        config_manager.path().display(),
        config.cache.name
    );

    match cli.command {
        Commands::Install(args) => precache::cli::commands::install(args, &config).await,
        Commands::Activate => precache::cli::commands::activate(&config).await,
        Commands::Fetch(args) => precache::cli::commands::fetch(args, &config).await,
        Commands::Caches(args) => precache::cli::commands::caches(args, &config).await,
        Commands::Config(args) => {
            precache::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
