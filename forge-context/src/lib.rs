#![deny(missing_docs)]
//! Memory-context assembly for the orchestrator (spec.md §4.6 step 3):
//! recent conversation history, semantically similar prior snippets, and
//! accumulated knowledge, concatenated into one prompt-ready string.
//!
//! Key-space conventions (`conversation_log`, `knowledge`) are kept
//! separate from the assembly logic (`builder`) so `forge-state`'s narrow
//! store traits and `forge-orchestrator`'s persistence path can reuse the
//! same key shapes without depending on the builder itself.

pub mod builder;
pub mod conversation_log;
pub mod knowledge;

pub use builder::{ContextConfig, MemoryContextBuilder};
