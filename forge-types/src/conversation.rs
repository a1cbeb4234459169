//! Durable conversation records and the two other append-only durable
//! records the background loops write: improvement attempts and
//! (in-memory) error records.

use chrono::{DateTime, Utc};
use layer0::id::{ConversationId, ErrorRecordId, ImprovementAttemptId};
use serde::{Deserialize, Serialize};

/// One turn of durable history: the user's input, the agent's final
/// response, and whatever metadata the orchestrator chose to attach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique id.
    pub id: ConversationId,
    /// When this turn was persisted.
    pub ts: DateTime<Utc>,
    /// The raw user message (after project-mention stripping).
    pub user_msg: String,
    /// The synthesized agent response returned to the caller.
    pub agent_msg: String,
    /// Free-form metadata: intent label, project id, plan id, token count,
    /// whatever the orchestrator finds useful to carry forward.
    pub metadata: serde_json::Value,
}

impl Conversation {
    /// Build a new conversation record.
    pub fn new(id: impl Into<ConversationId>, ts: DateTime<Utc>, user_msg: impl Into<String>, agent_msg: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self { id: id.into(), ts, user_msg: user_msg.into(), agent_msg: agent_msg.into(), metadata }
    }
}

/// A durable record of one improvement-loop cycle (spec.md §4.9, §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImprovementAttempt {
    /// Unique id.
    pub id: ImprovementAttemptId,
    /// Monotonically increasing cycle counter, persisted across restarts.
    pub cycle: u64,
    /// The short-lived VCS branch this cycle worked on.
    pub branch: String,
    /// Paths touched relative to the repo root.
    pub changed_paths: Vec<String>,
    /// Whether the branch was merged into mainline.
    pub merged: bool,
    /// Tokens consumed by the orchestrator run this cycle invoked.
    pub tokens_used: u64,
    /// Populated if the cycle's orchestrator run errored or timed out.
    pub error: Option<String>,
    /// When this attempt was recorded.
    pub created_at: DateTime<Utc>,
}

/// An in-memory, bounded error record fed by the structured log stream
/// (spec.md §3, §4.11). Never persisted to the durable store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Unique id, assigned when the record is first created (not on
    /// every dedup-refresh).
    pub id: ErrorRecordId,
    /// Most recent occurrence's timestamp; refreshed on dedup hits.
    pub timestamp: DateTime<Utc>,
    /// The `tracing` target/module path the error originated in.
    pub origin: String,
    /// The formatted error message.
    pub message: String,
    /// Optional captured stack/backtrace text.
    pub stack_trace: Option<String>,
    /// How many times this `(origin, message)` pair has recurred within
    /// dedup windows since it was first seen.
    pub occurrence_count: u64,
    /// Set by `mark_all_resolved`.
    pub resolved: bool,
}

impl ErrorRecord {
    /// The dedup key: identical origin + message within the dedup window
    /// refreshes this record instead of creating a new one.
    pub fn dedup_key(origin: &str, message: &str) -> String {
        format!("{origin}\u{0}{message}")
    }
}
