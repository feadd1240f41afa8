//! Terminal output helpers for the maintenance commands
//!
//! Styled symbols on an interactive terminal, bracketed plain tags
//! otherwise (pipes, CI).

mod context;
mod output;

pub use context::UiContext;
pub use output::{confirm, intro, key_value, step_info, step_ok, step_ok_detail, step_warn_hint};
