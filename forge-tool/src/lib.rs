#![deny(missing_docs)]
//! The process-wide tool registry and its built-in filesystem/source tool
//! family (spec.md §4.1). Path-containment itself lives in
//! `forge-sandbox`; this crate is the dispatch layer on top of it.

pub mod builtin;
pub mod git;
pub mod registry;

pub use git::GitCli;
pub use registry::{AutoCommit, Tool, ToolRegistry};
