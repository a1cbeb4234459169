//! Payload shape for [`forge_bus`](../forge_bus/index.html) events.
//!
//! Not named by spec.md directly, but the message bus (§4.10) needs a
//! concrete event shape to fan out; this is it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One named event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusEvent {
    /// Dotted event type, e.g. `"plan.started"`, `"task.completed"`.
    pub event_type: String,
    /// Arbitrary JSON payload; shape is a convention between publisher and
    /// subscribers, not enforced by the bus.
    pub payload: serde_json::Value,
    /// When the event was published.
    pub emitted_at: DateTime<Utc>,
}

impl BusEvent {
    /// Build a new event with the given type and payload, stamped with the
    /// current time.
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self { event_type: event_type.into(), payload, emitted_at: Utc::now() }
    }

    /// `plan.started`: a plan's execution began.
    pub fn plan_started(plan_id: &str, original_request: &str) -> Self {
        Self::new("plan.started", serde_json::json!({"plan_id": plan_id, "original_request": original_request}))
    }

    /// `task.started`: one task within a plan began running.
    pub fn task_started(plan_id: &str, task_id: &str, agent: &str) -> Self {
        Self::new("task.started", serde_json::json!({"plan_id": plan_id, "task_id": task_id, "agent": agent}))
    }

    /// `task.completed`: one task within a plan finished successfully.
    pub fn task_completed(plan_id: &str, task_id: &str) -> Self {
        Self::new("task.completed", serde_json::json!({"plan_id": plan_id, "task_id": task_id}))
    }

    /// `task.failed`: one task within a plan finished unsuccessfully.
    pub fn task_failed(plan_id: &str, task_id: &str, error: &str) -> Self {
        Self::new("task.failed", serde_json::json!({"plan_id": plan_id, "task_id": task_id, "error": error}))
    }

    /// `plan.completed`: every task in a plan reached a terminal state.
    pub fn plan_completed(plan_id: &str, has_failures: bool) -> Self {
        Self::new("plan.completed", serde_json::json!({"plan_id": plan_id, "has_failures": has_failures}))
    }

    /// `project_changed`: the orchestrator switched the active workspace
    /// to a different project.
    pub fn project_changed(project_id: &str, slug: &str) -> Self {
        Self::new("project_changed", serde_json::json!({"project_id": project_id, "slug": slug}))
    }
}
