//! Caches command - list cache stores and their entries

use crate::cache::CacheStorage;
use crate::cli::args::{CachesArgs, OutputFormat};
use crate::config::Config;
use crate::error::PrecacheResult;
use console::style;

/// One cache and its keys, as listed
#[derive(Debug, Clone, serde::Serialize)]
struct CacheListing {
    name: String,
    current: bool,
    entries: Vec<String>,
}

/// Execute the caches command
pub async fn execute(args: CachesArgs, config: &Config) -> PrecacheResult<()> {
    let storage = super::storage(config);
    let listings = collect(&storage, &config.cache.name).await?;

    if listings.is_empty() && args.format != OutputFormat::Json {
        println!("No caches found.");
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&listings),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listings)?),
        OutputFormat::Plain => print_plain(&listings),
    }

    Ok(())
}

async fn collect(
    storage: &dyn CacheStorage,
    current: &str,
) -> PrecacheResult<Vec<CacheListing>> {
    let mut listings = Vec::new();
    for name in storage.keys().await? {
        let cache = storage.open(&name).await?;
        listings.push(CacheListing {
            current: name == current,
            entries: cache.keys().await?,
            name,
        });
    }
    Ok(listings)
}

fn print_table(listings: &[CacheListing]) {
    println!("{:<40} {:<10} {:<8}", "CACHE", "STATE", "ENTRIES");
    println!("{}", "-".repeat(60));

    for listing in listings {
        let state = if listing.current {
            style("current").green().to_string()
        } else {
            style("stale").yellow().to_string()
        };
        println!(
            "{:<40} {:<10} {:<8}",
            listing.name,
            state,
            listing.entries.len()
        );
        for entry in &listing.entries {
            println!("  {} {}", style("•").dim(), entry);
        }
    }

    println!();
    println!("Total: {} cache(s)", listings.len());
}

fn print_plain(listings: &[CacheListing]) {
    for listing in listings {
        for entry in &listing.entries {
            println!("{}\t{}", listing.name, entry);
        }
    }
}
