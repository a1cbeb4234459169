//! Startup argument parsing (spec.md §6: "a single interactive REPL").

use clap::Parser;
use std::path::PathBuf;

/// The forge REPL.
#[derive(Parser, Debug)]
#[command(name = "forge", about = "Self-hosted agent orchestration runtime", version)]
pub struct Cli {
    /// Path to a runtime config file. Optional — falls back to defaults.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true, default_value = "info")]
    pub log_level: String,

    /// Process this as the first prompt before dropping into the REPL.
    pub initial_prompt: Option<String>,
}
