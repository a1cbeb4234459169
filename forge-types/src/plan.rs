//! A plan: a directed acyclic graph of [`crate::task::TaskSpec`] derived
//! from a single user request.

use crate::task::{TaskSpec, TaskStatus};
use layer0::id::PlanId;
use serde::{Deserialize, Serialize};

/// A DAG of tasks produced by the planner (or its fallback) for one user
/// request.
///
/// Invariants: every id referenced in a task's `depends_on` should exist
/// somewhere in `tasks` (the executor treats a dangling reference as an
/// unsatisfiable dependency rather than rejecting the plan at
/// construction — see `forge-executor`'s deadlock handling). A plan is
/// terminal once every task has reached `Done` or `Failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Unique id for this plan.
    pub id: PlanId,
    /// One-line summary produced by the planner, or a placeholder for the
    /// fallback plan.
    pub summary: String,
    /// Ordered sequence of tasks. Order is insertion order, not execution
    /// order — the executor computes the latter from `depends_on`.
    pub tasks: Vec<TaskSpec>,
    /// The original natural-language user request this plan was built for.
    pub original_request: String,
}

impl Plan {
    /// Build a new plan.
    pub fn new(id: impl Into<PlanId>, summary: impl Into<String>, tasks: Vec<TaskSpec>, original_request: impl Into<String>) -> Self {
        Self { id: id.into(), summary: summary.into(), tasks, original_request: original_request.into() }
    }

    /// Build the one-task fallback plan the planner returns when it can't
    /// parse a structured response.
    pub fn fallback(original_request: impl Into<String>) -> Self {
        let original_request = original_request.into();
        let task = TaskSpec::new("t1", "handle request", original_request.clone(), "generalist", vec![]);
        Self { id: PlanId::new("fallback"), summary: "fallback single-task plan".to_string(), tasks: vec![task], original_request }
    }

    /// True once every task has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.tasks.iter().all(TaskSpec::is_terminal)
    }

    /// True if at least one task failed.
    pub fn has_failures(&self) -> bool {
        self.tasks.iter().any(|t| t.status == TaskStatus::Failed)
    }

    /// Look up a task by id.
    pub fn task(&self, id: &str) -> Option<&TaskSpec> {
        self.tasks.iter().find(|t| t.id.as_str() == id)
    }

    /// Mutable lookup by id.
    pub fn task_mut(&mut self, id: &str) -> Option<&mut TaskSpec> {
        self.tasks.iter_mut().find(|t| t.id.as_str() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_plan_has_one_generalist_task() {
        let plan = Plan::fallback("do the thing");
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].agent, "generalist");
        assert_eq!(plan.tasks[0].description, "do the thing");
    }

    #[test]
    fn terminal_requires_every_task_done_or_failed() {
        let mut plan = Plan::new("p1", "s", vec![TaskSpec::new("t1", "n", "d", "coder", vec![])], "req");
        assert!(!plan.is_terminal());
        plan.task_mut("t1").unwrap().status = TaskStatus::Done;
        assert!(plan.is_terminal());
        assert!(!plan.has_failures());
    }
}
