//! Interactive command-line surface for HopeLine

mod repl;
mod ui;

#[cfg(test)]
mod tests;

pub use repl::{Exchange, GOODBYE, HUMAN_PROMPT, InteractiveSession, SessionEnd};
pub use ui::display_banner;

// Re-export core types
pub use hopeline_core::{Error, Result};
