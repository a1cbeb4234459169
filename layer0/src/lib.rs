#![deny(missing_docs)]
//! Shared vocabulary for the forge runtime: typed ids, scopes, the
//! per-component error taxonomy, a duration newtype, and the
//! [`state::StateStore`] protocol trait.
//!
//! Everything above the tool registry (the agent loop, the planner, the
//! executor, the orchestrator, the two background loops) depends on this
//! crate and nothing else in the workspace — it is the floor, not a
//! framework.

pub mod duration;
pub mod error;
pub mod id;
pub mod scope;
pub mod state;

pub use duration::DurationMs;
pub use scope::Scope;
