//! A node in a plan's dependency graph.

use layer0::id::TaskId;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`TaskSpec`]. Monotonically advances
/// `Pending -> Running -> {Done, Failed}`; never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet started; waiting on dependencies or a free executor slot.
    Pending,
    /// An agent is currently running this task.
    Running,
    /// Finished successfully.
    Done,
    /// Finished unsuccessfully (including deadlock).
    Failed,
}

/// One node in a [`crate::plan::Plan`]'s dependency graph.
///
/// Invariant: every id in `depends_on` must be a `TaskSpec.id` that exists
/// somewhere in the same plan (the executor doesn't enforce this at
/// construction — an unsatisfiable dependency surfaces as a deadlock at
/// execution time, per the planner's fallback design).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Unique within the owning plan.
    pub id: TaskId,
    /// Short human-readable name, used in dependency-context headers.
    pub name: String,
    /// Natural-language description handed to the agent as its task.
    pub description: String,
    /// The role of the agent that should run this task (e.g. "researcher",
    /// "coder"). Unknown roles fall back to "generalist" at dispatch time.
    pub agent: String,
    /// Ids of tasks that must reach `Done` before this one becomes ready.
    pub depends_on: Vec<TaskId>,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// Populated once `status == Done`.
    pub result: Option<String>,
    /// Populated once `status == Failed`.
    pub error: Option<String>,
}

impl TaskSpec {
    /// Build a new pending task with no result/error yet.
    pub fn new(
        id: impl Into<TaskId>,
        name: impl Into<String>,
        description: impl Into<String>,
        agent: impl Into<String>,
        depends_on: Vec<TaskId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            agent: agent.into(),
            depends_on,
            status: TaskStatus::Pending,
            result: None,
            error: None,
        }
    }

    /// True once this task has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Done | TaskStatus::Failed)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId::new(s)
    }
}
