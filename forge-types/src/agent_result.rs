//! The outcome of one [`forge_agent`](../forge_agent/index.html)-style
//! agent invocation. Lives in `forge-types` rather than `forge-agent`
//! because the executor, the orchestrator, and the improvement loop all
//! need to name this shape without depending on the agent loop itself.

use layer0::id::TaskId;
use serde::{Deserialize, Serialize};

/// Result of running one agent to completion (or failure) on one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    /// The task this result is for.
    pub task_id: TaskId,
    /// The role/agent name that produced this result.
    pub agent_name: String,
    /// Whether the agent reached a terminal success state.
    pub success: bool,
    /// The final text output. Empty on failure.
    pub output: String,
    /// How many tool calls were made across the whole run.
    pub tool_calls_made: u32,
    /// Populated when `success == false`.
    pub error: Option<String>,
    /// Tokens consumed across every `complete` call this run made
    /// (prompt + completion), threaded from `Response::usage`.
    pub tokens_used: u64,
}

impl AgentResult {
    /// Build a successful result.
    pub fn ok(task_id: impl Into<TaskId>, agent_name: impl Into<String>, output: impl Into<String>, tool_calls_made: u32, tokens_used: u64) -> Self {
        Self {
            task_id: task_id.into(),
            agent_name: agent_name.into(),
            success: true,
            output: output.into(),
            tool_calls_made,
            error: None,
            tokens_used,
        }
    }

    /// Build a failed result.
    pub fn err(task_id: impl Into<TaskId>, agent_name: impl Into<String>, error: impl Into<String>, tool_calls_made: u32, tokens_used: u64) -> Self {
        Self {
            task_id: task_id.into(),
            agent_name: agent_name.into(),
            success: false,
            output: String::new(),
            tool_calls_made,
            error: Some(error.into()),
            tokens_used,
        }
    }
}
