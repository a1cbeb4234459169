//! Where state lives. Scopes are hierarchical — a session scope is
//! narrower than a project scope, which is narrower than global.

use crate::id::{ProjectId, SessionId};
use serde::{Deserialize, Serialize};

/// A scope a [`crate::state::StateStore`] key is written under.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    /// Per-conversation/session.
    Session(SessionId),
    /// Per-project.
    Project(ProjectId),
    /// Shared across all projects — e.g. improvement-loop counters.
    Global,
    /// Escape hatch for scopes not yet named.
    Custom(String),
}

impl Scope {
    /// A stable string prefix used by key-value store implementations
    /// to namespace keys without colliding across scopes.
    pub fn prefix(&self) -> String {
        match self {
            Scope::Session(id) => format!("session:{id}"),
            Scope::Project(id) => format!("project:{id}"),
            Scope::Global => "global".to_string(),
            Scope::Custom(name) => format!("custom:{name}"),
        }
    }
}
