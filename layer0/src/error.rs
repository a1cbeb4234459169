//! Per-component error taxonomy.
//!
//! Every component gets its own `#[non_exhaustive]` enum so adding a new
//! failure mode is not a breaking change. Each carries an `Other` catch-all
//! for errors that don't fit a named variant yet. None of these are ever
//! thrown across a component boundary as an exception — callers convert
//! them into the result types their callers expect (`ToolResult`,
//! `AgentResult`, `TaskSpec.error`, …) per the propagation policy.

use thiserror::Error;

/// Errors raised by the tool registry.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool is registered under this name.
    #[error("tool '{0}' not found")]
    NotFound(String),

    /// The tool handler ran and failed.
    #[error("tool execution failed: {0}")]
    Execution(String),

    /// Arguments didn't satisfy the tool's parameter schema.
    #[error("invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments {
        /// Name of the tool that rejected its arguments.
        tool: String,
        /// Human-readable validation failure.
        reason: String,
    },

    /// The handler exceeded its allotted timeout.
    #[error("tool '{0}' timed out")]
    Timeout(String),

    /// Catch-all for errors not covered above.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors raised by the workspace sandbox while resolving a path.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The resolved path escapes the sandbox root.
    #[error("path '{path}' escapes workspace root '{root}'")]
    PathEscape {
        /// The raw path as given by the caller.
        path: String,
        /// The sandbox root it was checked against.
        root: String,
    },

    /// No project-root marker file could be found by walking upward.
    #[error("no project root found above '{0}'")]
    NoProjectRoot(String),

    /// Catch-all.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors raised by a [`crate::state::StateStore`] implementation.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StateError {
    /// The backing store is unreachable or refused the operation.
    #[error("state store backend error: {0}")]
    Backend(String),

    /// The stored value didn't deserialize to the requested shape.
    #[error("corrupt value at key '{0}'")]
    Corrupt(String),

    /// Catch-all.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors raised by the planner.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PlanError {
    /// The provider call that was supposed to produce plan JSON failed.
    #[error("planning request failed: {0}")]
    RequestFailed(String),

    /// The response wasn't valid JSON, or didn't match the plan schema.
    /// Callers fall back to a single-task plan rather than propagating this.
    #[error("could not parse plan from model response: {0}")]
    ParseFailure(String),
}

/// Errors raised by the plan executor.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The plan referenced unknown agent roles, a cycle, or some other
    /// structural defect that prevented scheduling from starting at all.
    #[error("malformed plan: {0}")]
    MalformedPlan(String),

    /// Catch-all.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors raised by the scheduler algebra while validating a recurrence spec.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The recurrence `type` tag is not one of the known variants.
    #[error("invalid schedule type '{0}'")]
    InvalidType(String),

    /// A required field for this schedule type is missing or malformed.
    #[error("invalid schedule field '{field}': {reason}")]
    InvalidField {
        /// The offending field name.
        field: String,
        /// Human-readable reason.
        reason: String,
    },
}

/// Errors raised by the orchestrator's `run` entrypoint. Per the propagation
/// policy, only catastrophic failures (e.g. the persistent store is
/// unreachable at the final persist step) surface as this error — everything
/// else is folded into the user-facing response string.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum OrchError {
    /// The durable store could not be reached to persist a conversation.
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),

    /// Catch-all.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
