//! Terminal output for the CLI host
//!
//! Colors and spinners in an interactive terminal, plain `[OK]`-style lines
//! in CI and when piped.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{key_value, step_info, step_ok, step_ok_detail, step_warn_hint};
pub use progress::TaskSpinner;
