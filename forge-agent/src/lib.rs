#![deny(missing_docs)]
//! The tool-calling agent loop (spec.md §4.3): `Agent::run`, the built-in
//! [`role::RoleRegistry`], and the provider retry policy (spec.md §7).

pub mod agent;
pub mod retry;
pub mod role;
pub mod runner;

pub use agent::{Agent, AgentContext, DEFAULT_MAX_ITERATIONS};
pub use role::{RoleDescriptor, RoleRegistry};
pub use runner::{AgentRunner, RegistryRunner};
