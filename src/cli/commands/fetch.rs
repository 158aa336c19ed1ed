//! Fetch command - run one request through the worker

use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::{PrecacheError, PrecacheResult};
use crate::host::WorkerHost;
use crate::http::Request;
use console::style;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> PrecacheResult<()> {
    let (worker, network) = super::worker(config);
    let host = WorkerHost::new(worker, config.worker.clone(), network);

    let response = host.fetch(Request::get(args.url.clone())).await?;

    let status = format!("{} {}", response.status, response.status_text);
    let status = if response.is_ok() {
        style(status.trim_end()).green()
    } else {
        style(status.trim_end()).yellow()
    };
    eprintln!("{} {}", status, style(&args.url).dim());

    if args.include {
        for (name, value) in &response.headers {
            eprintln!("{}: {}", name, value);
        }
        eprintln!();
    }

    match args.output {
        Some(path) => {
            fs::write(&path, &response.body)
                .await
                .map_err(|e| PrecacheError::io(format!("writing {}", path.display()), e))?;
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(&response.body)
                .await
                .map_err(|e| PrecacheError::io("writing response body", e))?;
            stdout
                .flush()
                .await
                .map_err(|e| PrecacheError::io("writing response body", e))?;
        }
    }

    Ok(())
}
