#![deny(missing_docs)]
//! Core data model for the forge runtime: every entity named in the
//! system's data model, and nothing else. Depends only on `layer0`.
//!
//! Modules are organized one-per-entity-family rather than one giant
//! file, matching the rest of the workspace's per-concern split.

pub mod agent_result;
pub mod bus_event;
pub mod conversation;
pub mod message;
pub mod plan;
pub mod project;
pub mod scheduled_item;
pub mod task;
pub mod tool;

pub use agent_result::AgentResult;
pub use bus_event::BusEvent;
pub use conversation::{Conversation, ErrorRecord, ImprovementAttempt};
pub use message::{Message, Role, ToolCall};
pub use plan::Plan;
pub use project::Project;
pub use scheduled_item::{RecurrenceSpec, ScheduledItem, ScheduledItemStatus, ScheduledItemType};
pub use task::{TaskSpec, TaskStatus};
pub use tool::{ToolResult, ToolSpec};
