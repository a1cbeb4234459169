//! A turn in an LLM conversation, and the tool-call records threaded
//! through it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Who spoke a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The role-specific system prompt, always first.
    System,
    /// The human (or calling loop) request.
    User,
    /// A model response, possibly carrying tool calls.
    Assistant,
    /// The result of invoking a tool, paired to a prior assistant turn's
    /// tool call by `tool_call_id`.
    Tool,
}

/// A request from the model to invoke a registered capability.
///
/// Every `ToolCall` emitted in one assistant turn must be followed, before
/// the next assistant turn, by a [`Role::Tool`] message whose
/// `tool_call_id` matches this call's `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Opaque id, echoed back on the paired tool-result message.
    pub id: String,
    /// The registered tool name.
    pub name: String,
    /// Structured argument mapping: string keys to JSON-typed values.
    pub arguments: HashMap<String, serde_json::Value>,
}

/// One message in the list handed to [`forge_provider::Provider::complete`].
///
/// Content may be empty when tool calls are attached (an assistant turn
/// that only calls tools has no text to show). `tool_call_id` is set only
/// on `Role::Tool` messages; `tool_calls` is set only on `Role::Assistant`
/// messages that invoked one or more tools.
///
/// Messages are built fresh per agent run and are never persisted directly
/// — persistence happens at the [`crate::conversation::Conversation`] level,
/// after synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who spoke this message.
    pub role: Role,
    /// Text content. May be empty (but not absent) when `tool_calls` is set.
    pub content: String,
    /// Set only when `role == Role::Tool`: the id of the call this message
    /// is the result of.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_call_id: Option<String>,
    /// Set only when `role == Role::Assistant` and the model chose to call
    /// tools this turn.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into(), tool_call_id: None, tool_calls: None }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), tool_call_id: None, tool_calls: None }
    }

    /// Build a plain assistant message with no tool calls.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), tool_call_id: None, tool_calls: None }
    }

    /// Build an assistant message that invoked tools. Content may be empty.
    pub fn assistant_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Some(tool_calls),
        }
    }

    /// Build the tool-result message paired to a prior tool call.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }
}
