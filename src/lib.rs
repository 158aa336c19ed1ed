//! precache - offline caching agent
//!
//! Precaches a fixed list of static assets into a named cache on install,
//! deletes caches with any other name on activate, and answers requests
//! cache-first with a network fallback.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod http;
pub mod network;
pub mod ui;
pub mod worker;

pub use error::{PrecacheError, PrecacheResult};
pub use host::{WorkerHost, WorkerState};
pub use worker::{OfflineWorker, WorkerScript};
