//! Command-line host for the offline worker

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
