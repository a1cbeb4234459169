#![deny(missing_docs)]
//! The error collector (spec.md §4.11): a bounded, deduplicating ring fed
//! by the structured `tracing` log stream, surfaced to the improvement
//! loop's error-mode gate and fix-mode prompt.

mod collector;
mod layer;

pub use collector::ErrorCollector;
pub use layer::ErrorCollectorLayer;
