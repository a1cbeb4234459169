//! The process-wide tool registry: dispatch, schema export, and the
//! normalization + auto-commit + error-enrichment behavior spec.md §4.1
//! and §7 describe.

use async_trait::async_trait;
use forge_types::{ToolResult, ToolSpec};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Names of the mutating tools that trigger the post-mutation auto-commit
/// side effect on success.
const MUTATING_TOOLS: &[&str] = &["write_file", "append_file", "delete_file", "mkdir", "write_source"];

/// Names of read tools whose `path` argument gets normalized and whose
/// failures get the "normalization + hint" enrichment.
const PATH_READ_TOOLS: &[&str] = &["read_file", "list_files", "check_path", "read_source", "list_source"];

/// A registered capability: object-safe so heterogeneous tool
/// implementations (local function, future MCP/HTTP-backed tools) can
/// live behind one `Arc<dyn Tool>` in the registry, per the "uniform
/// variant over heterogeneous tools" re-architecture constraint.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model refers to this tool by.
    fn name(&self) -> &str;

    /// Human/model-readable description.
    fn description(&self) -> &str;

    /// JSON-Schema object describing accepted arguments.
    fn parameters(&self) -> serde_json::Value;

    /// Run the tool. Implementations should never panic on bad input —
    /// return `ToolResult::err` instead; the registry is the layer that
    /// guarantees "never raises" to callers, but a well-behaved tool
    /// shouldn't rely on that backstop.
    async fn invoke(&self, arguments: HashMap<String, serde_json::Value>) -> ToolResult;
}

/// Side effect fired after a mutating tool succeeds: stage all, commit.
/// Failures are swallowed by the registry per spec.md §4.1 — they never
/// propagate to the caller or the model.
#[async_trait]
pub trait AutoCommit: Send + Sync {
    /// Attempt to commit all pending changes with a generated message.
    async fn commit(&self, message: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

type HandlerFuture<'a> = Pin<Box<dyn Future<Output = ToolResult> + Send + 'a>>;

/// Process-wide mapping from tool name to `{description, schema, handler}`.
///
/// Concurrent registration is allowed (last-writer-wins on a given name);
/// typical use registers every built-in tool once at startup.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    auto_commit: Option<Arc<dyn AutoCommit>>,
}

impl ToolRegistry {
    /// An empty registry with no auto-commit hook configured.
    pub fn new() -> Self {
        Self { tools: HashMap::new(), auto_commit: None }
    }

    /// Attach (or replace) the auto-commit hook used after mutating tools
    /// succeed.
    pub fn with_auto_commit(mut self, hook: Arc<dyn AutoCommit>) -> Self {
        self.auto_commit = Some(hook);
        self
    }

    /// Register a tool. Overwrites any existing tool of the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Invoke a tool by name. Never raises: unknown tools and handler
    /// failures both come back as `ToolResult { success: false, .. }`.
    pub async fn invoke(&self, name: &str, mut arguments: HashMap<String, serde_json::Value>) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            return ToolResult::err(format!("tool '{name}' not found"));
        };

        let raw_path = arguments.get("path").and_then(|v| v.as_str()).map(str::to_string);
        if PATH_READ_TOOLS.contains(&name)
            && let Some(raw) = raw_path.clone()
        {
            let normalized = forge_sandbox::normalize(&raw);
            arguments.insert("path".to_string(), serde_json::Value::String(normalized));
        }

        let result = tool.invoke(arguments).await;

        let result = if !result.success && PATH_READ_TOOLS.contains(&name) {
            enrich_path_error(result, raw_path.as_deref())
        } else {
            result
        };

        if result.success && MUTATING_TOOLS.contains(&name) {
            self.fire_auto_commit(name).await;
        }

        result
    }

    async fn fire_auto_commit(&self, tool_name: &str) {
        let Some(hook) = &self.auto_commit else { return };
        let message = format!("auto-commit: {tool_name}");
        if let Err(err) = hook.commit(&message).await {
            tracing::warn!(tool = tool_name, error = %err, "auto-commit failed, continuing");
        }
    }

    /// Export every registered tool's schema in the provider's
    /// function-calling shape.
    pub fn schemas(&self) -> Vec<ToolSpec> {
        self.tools
            .values()
            .map(|t| ToolSpec { name: t.name().to_string(), description: t.description().to_string(), parameters: t.parameters() })
            .collect()
    }

    /// A human-readable capability listing, suitable for embedding in a
    /// system prompt.
    pub fn describe_for_prompt(&self) -> String {
        let mut names: Vec<_> = self.tools.values().collect();
        names.sort_by_key(|t| t.name().to_string());
        names.iter().map(|t| format!("- {}: {}", t.name(), t.description())).collect::<Vec<_>>().join("\n")
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry has no tools registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn enrich_path_error(result: ToolResult, raw_path: Option<&str>) -> ToolResult {
    let Some(raw) = raw_path else { return result };
    let normalized = forge_sandbox::normalize(raw);
    let original_error = result.error.unwrap_or_default();
    let enriched = format!(
        "{original_error} (raw path: '{raw}', normalized: '{normalized}'); use list_files/check_path first"
    );
    ToolResult::err(enriched)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn parameters(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn invoke(&self, arguments: HashMap<String, serde_json::Value>) -> ToolResult {
            ToolResult::ok(serde_json::to_string(&arguments).unwrap())
        }
    }

    struct AlwaysFailsReadFile;

    #[async_trait]
    impl Tool for AlwaysFailsReadFile {
        fn name(&self) -> &str {
            "read_file"
        }
        fn description(&self) -> &str {
            "reads a file"
        }
        fn parameters(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn invoke(&self, _arguments: HashMap<String, serde_json::Value>) -> ToolResult {
            ToolResult::err("no such file")
        }
    }

    #[tokio::test]
    async fn unknown_tool_never_raises() {
        let registry = ToolRegistry::new();
        let result = registry.invoke("nope", HashMap::new()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("tool 'nope' not found"));
    }

    #[tokio::test]
    async fn registered_tool_dispatches() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        let mut args = HashMap::new();
        args.insert("x".to_string(), serde_json::json!(1));
        let result = registry.invoke("echo", args).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn failed_path_read_gets_enriched_error() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(AlwaysFailsReadFile));
        let mut args = HashMap::new();
        args.insert("path".to_string(), serde_json::json!("  "));
        let result = registry.invoke("read_file", args).await;
        assert!(!result.success);
        let err = result.error.unwrap();
        assert!(err.contains("raw path"));
        assert!(err.contains("normalized: '.'"));
        assert!(err.contains("list_files/check_path first"));
    }

    #[tokio::test]
    async fn schemas_and_describe_cover_registered_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        assert_eq!(registry.schemas().len(), 1);
        assert!(registry.describe_for_prompt().contains("echo"));
    }
}
