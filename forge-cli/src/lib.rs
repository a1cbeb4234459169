#![deny(missing_docs)]
//! The interactive REPL front door (spec.md §6): a single loop where each
//! non-blank, non-`/`-prefixed line becomes one `Orchestrator::run(intent
//! = user)` call, plus a handful of `/`-prefixed commands for inspecting
//! and managing runtime state directly.
//!
//! Uses a `rustyline`/`colored`/slash-command shape: a line editor with
//! history, colorized output, and `/`-prefixed commands dispatched
//! separately from plain prompts.

pub mod cli;
mod session;

pub use cli::Cli;
pub use session::ReplSession;

use thiserror::Error;

/// Top-level error the REPL binary's `main` can surface as a non-zero
/// exit code (spec.md §6: "non-zero on unhandled error").
#[derive(Debug, Error)]
pub enum CliError {
    /// The line-editor failed to initialize or read a line.
    #[error("readline error: {0}")]
    Readline(String),
}
