//! A registered capability description and the outcome of invoking one.

use serde::{Deserialize, Serialize};

/// A registered capability: name, description, and a JSON-Schema parameter
/// description. Names are unique within a registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique name the model refers to this tool by.
    pub name: String,
    /// Human/model-readable description.
    pub description: String,
    /// JSON-Schema object describing accepted arguments.
    pub parameters: serde_json::Value,
}

/// The outcome of a single tool invocation. Never raises — an unknown tool
/// or a handler failure both come back as `success = false` with a
/// descriptive `error`, which becomes the observation the model sees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the invocation succeeded.
    pub success: bool,
    /// Stdout-shaped output on success. Empty on failure.
    pub output: String,
    /// Populated on failure; `None` on success.
    pub error: Option<String>,
}

impl ToolResult {
    /// A successful result carrying `output`.
    pub fn ok(output: impl Into<String>) -> Self {
        Self { success: true, output: output.into(), error: None }
    }

    /// A failed result carrying `error`.
    pub fn err(error: impl Into<String>) -> Self {
        Self { success: false, output: String::new(), error: Some(error.into()) }
    }

    /// Render as the string a tool-result message's content should hold.
    pub fn as_observation(&self) -> String {
        if self.success {
            self.output.clone()
        } else {
            format!("error: {}", self.error.as_deref().unwrap_or("unknown error"))
        }
    }
}
