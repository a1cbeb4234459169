//! The built-in filesystem and source-tool family, grounded against the
//! two sandbox anchors from `forge-sandbox`: the per-project workspace
//! root (`read_file`/`write_file`/`append_file`/`list_files`/
//! `check_path`/`delete_file`/`mkdir`) and the repo-root anchor
//! (`read_source`/`write_source`/`list_source`/`run_tests`/`git_commit`).

use crate::git::GitCli;
use crate::registry::Tool;
use async_trait::async_trait;
use forge_sandbox::{ProjectAnchor, Sandbox};
use forge_types::ToolResult;
use std::collections::HashMap;
use std::sync::Arc;

fn required_str(arguments: &HashMap<String, serde_json::Value>, key: &str) -> Result<String, String> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| format!("missing required argument '{key}'"))
}

fn schema_with_path(extra_props: serde_json::Value, required: &[&str]) -> serde_json::Value {
    let mut props = serde_json::json!({"path": {"type": "string", "description": "path relative to the workspace root"}});
    if let serde_json::Value::Object(extra) = extra_props
        && let serde_json::Value::Object(p) = &mut props
    {
        p.extend(extra);
    }
    serde_json::json!({"type": "object", "properties": props, "required": required})
}

/// `read_file`: read a UTF-8 file within the workspace sandbox.
pub struct ReadFileTool {
    sandbox: Arc<Sandbox>,
}

impl ReadFileTool {
    /// Build against the given workspace sandbox.
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }
    fn description(&self) -> &str {
        "Read the full contents of a UTF-8 text file within the workspace."
    }
    fn parameters(&self) -> serde_json::Value {
        schema_with_path(serde_json::json!({}), &["path"])
    }
    async fn invoke(&self, arguments: HashMap<String, serde_json::Value>) -> ToolResult {
        let path = match required_str(&arguments, "path") {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e),
        };
        let resolved = match self.sandbox.resolve(&path) {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e.to_string()),
        };
        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => ToolResult::ok(content),
            Err(e) => ToolResult::err(format!("read failed: {e}")),
        }
    }
}

/// `write_file`: overwrite (or create) a file within the workspace sandbox.
pub struct WriteFileTool {
    sandbox: Arc<Sandbox>,
}

impl WriteFileTool {
    /// Build against the given workspace sandbox.
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }
    fn description(&self) -> &str {
        "Create or overwrite a UTF-8 text file within the workspace."
    }
    fn parameters(&self) -> serde_json::Value {
        schema_with_path(serde_json::json!({"content": {"type": "string"}}), &["path", "content"])
    }
    async fn invoke(&self, arguments: HashMap<String, serde_json::Value>) -> ToolResult {
        let path = match required_str(&arguments, "path") {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e),
        };
        let content = match required_str(&arguments, "content") {
            Ok(c) => c,
            Err(e) => return ToolResult::err(e),
        };
        let resolved = match self.sandbox.resolve(&path) {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e.to_string()),
        };
        if let Some(parent) = resolved.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return ToolResult::err(format!("could not create parent directories: {e}"));
        }
        match tokio::fs::write(&resolved, content).await {
            Ok(()) => ToolResult::ok(format!("wrote {} bytes to {path}", resolved.metadata().map(|m| m.len()).unwrap_or(0))),
            Err(e) => ToolResult::err(format!("write failed: {e}")),
        }
    }
}

/// `append_file`: append to a file within the workspace sandbox.
pub struct AppendFileTool {
    sandbox: Arc<Sandbox>,
}

impl AppendFileTool {
    /// Build against the given workspace sandbox.
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for AppendFileTool {
    fn name(&self) -> &str {
        "append_file"
    }
    fn description(&self) -> &str {
        "Append text to a file within the workspace, creating it if absent."
    }
    fn parameters(&self) -> serde_json::Value {
        schema_with_path(serde_json::json!({"content": {"type": "string"}}), &["path", "content"])
    }
    async fn invoke(&self, arguments: HashMap<String, serde_json::Value>) -> ToolResult {
        use tokio::io::AsyncWriteExt;
        let path = match required_str(&arguments, "path") {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e),
        };
        let content = match required_str(&arguments, "content") {
            Ok(c) => c,
            Err(e) => return ToolResult::err(e),
        };
        let resolved = match self.sandbox.resolve(&path) {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e.to_string()),
        };
        let file = tokio::fs::OpenOptions::new().create(true).append(true).open(&resolved).await;
        match file {
            Ok(mut f) => match f.write_all(content.as_bytes()).await {
                Ok(()) => ToolResult::ok(format!("appended to {path}")),
                Err(e) => ToolResult::err(format!("append failed: {e}")),
            },
            Err(e) => ToolResult::err(format!("append failed: {e}")),
        }
    }
}

/// `list_files`: list a directory's immediate entries within the
/// workspace sandbox.
pub struct ListFilesTool {
    sandbox: Arc<Sandbox>,
}

impl ListFilesTool {
    /// Build against the given workspace sandbox.
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }
    fn description(&self) -> &str {
        "List the immediate entries of a directory within the workspace."
    }
    fn parameters(&self) -> serde_json::Value {
        schema_with_path(serde_json::json!({}), &[])
    }
    async fn invoke(&self, arguments: HashMap<String, serde_json::Value>) -> ToolResult {
        let path = arguments.get("path").and_then(|v| v.as_str()).unwrap_or(".").to_string();
        let resolved = match self.sandbox.resolve(&path) {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e.to_string()),
        };
        let mut entries = match tokio::fs::read_dir(&resolved).await {
            Ok(e) => e,
            Err(e) => return ToolResult::err(format!("list failed: {e}")),
        };
        let mut names = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => names.push(entry.file_name().to_string_lossy().to_string()),
                Ok(None) => break,
                Err(e) => return ToolResult::err(format!("list failed: {e}")),
            }
        }
        names.sort();
        ToolResult::ok(names.join("\n"))
    }
}

/// `check_path`: report whether a path exists within the workspace sandbox.
pub struct CheckPathTool {
    sandbox: Arc<Sandbox>,
}

impl CheckPathTool {
    /// Build against the given workspace sandbox.
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for CheckPathTool {
    fn name(&self) -> &str {
        "check_path"
    }
    fn description(&self) -> &str {
        "Check whether a path exists within the workspace, and whether it is a file or directory."
    }
    fn parameters(&self) -> serde_json::Value {
        schema_with_path(serde_json::json!({}), &["path"])
    }
    async fn invoke(&self, arguments: HashMap<String, serde_json::Value>) -> ToolResult {
        let path = match required_str(&arguments, "path") {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e),
        };
        let resolved = match self.sandbox.resolve(&path) {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e.to_string()),
        };
        match tokio::fs::metadata(&resolved).await {
            Ok(meta) => ToolResult::ok(if meta.is_dir() { "directory" } else { "file" }),
            Err(_) => ToolResult::ok("absent"),
        }
    }
}

/// `delete_file`: remove a file within the workspace sandbox.
pub struct DeleteFileTool {
    sandbox: Arc<Sandbox>,
}

impl DeleteFileTool {
    /// Build against the given workspace sandbox.
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }
    fn description(&self) -> &str {
        "Delete a file within the workspace."
    }
    fn parameters(&self) -> serde_json::Value {
        schema_with_path(serde_json::json!({}), &["path"])
    }
    async fn invoke(&self, arguments: HashMap<String, serde_json::Value>) -> ToolResult {
        let path = match required_str(&arguments, "path") {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e),
        };
        let resolved = match self.sandbox.resolve(&path) {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e.to_string()),
        };
        match tokio::fs::remove_file(&resolved).await {
            Ok(()) => ToolResult::ok(format!("deleted {path}")),
            Err(e) => ToolResult::err(format!("delete failed: {e}")),
        }
    }
}

/// `mkdir`: create a directory (and parents) within the workspace sandbox.
pub struct MkdirTool {
    sandbox: Arc<Sandbox>,
}

impl MkdirTool {
    /// Build against the given workspace sandbox.
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for MkdirTool {
    fn name(&self) -> &str {
        "mkdir"
    }
    fn description(&self) -> &str {
        "Create a directory, including any missing parent directories, within the workspace."
    }
    fn parameters(&self) -> serde_json::Value {
        schema_with_path(serde_json::json!({}), &["path"])
    }
    async fn invoke(&self, arguments: HashMap<String, serde_json::Value>) -> ToolResult {
        let path = match required_str(&arguments, "path") {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e),
        };
        let resolved = match self.sandbox.resolve(&path) {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e.to_string()),
        };
        match tokio::fs::create_dir_all(&resolved).await {
            Ok(()) => ToolResult::ok(format!("created {path}")),
            Err(e) => ToolResult::err(format!("mkdir failed: {e}")),
        }
    }
}

/// `read_source`: read a file relative to the repo-root anchor, not the
/// per-project workspace.
pub struct ReadSourceTool {
    anchor: Arc<ProjectAnchor>,
}

impl ReadSourceTool {
    /// Build against the given project anchor.
    pub fn new(anchor: Arc<ProjectAnchor>) -> Self {
        Self { anchor }
    }
}

#[async_trait]
impl Tool for ReadSourceTool {
    fn name(&self) -> &str {
        "read_source"
    }
    fn description(&self) -> &str {
        "Read a file from the runtime's own source tree (repo root, not the task workspace)."
    }
    fn parameters(&self) -> serde_json::Value {
        schema_with_path(serde_json::json!({}), &["path"])
    }
    async fn invoke(&self, arguments: HashMap<String, serde_json::Value>) -> ToolResult {
        let path = match required_str(&arguments, "path") {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e),
        };
        let resolved = match self.anchor.resolve(&path) {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e.to_string()),
        };
        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => ToolResult::ok(content),
            Err(e) => ToolResult::err(format!("read failed: {e}")),
        }
    }
}

/// `write_source`: overwrite a file relative to the repo-root anchor.
/// Mutating: triggers auto-commit on success.
pub struct WriteSourceTool {
    anchor: Arc<ProjectAnchor>,
}

impl WriteSourceTool {
    /// Build against the given project anchor.
    pub fn new(anchor: Arc<ProjectAnchor>) -> Self {
        Self { anchor }
    }
}

#[async_trait]
impl Tool for WriteSourceTool {
    fn name(&self) -> &str {
        "write_source"
    }
    fn description(&self) -> &str {
        "Overwrite a file in the runtime's own source tree (repo root, not the task workspace)."
    }
    fn parameters(&self) -> serde_json::Value {
        schema_with_path(serde_json::json!({"content": {"type": "string"}}), &["path", "content"])
    }
    async fn invoke(&self, arguments: HashMap<String, serde_json::Value>) -> ToolResult {
        let path = match required_str(&arguments, "path") {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e),
        };
        let content = match required_str(&arguments, "content") {
            Ok(c) => c,
            Err(e) => return ToolResult::err(e),
        };
        let resolved = match self.anchor.resolve(&path) {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e.to_string()),
        };
        if let Some(parent) = resolved.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return ToolResult::err(format!("could not create parent directories: {e}"));
        }
        match tokio::fs::write(&resolved, content).await {
            Ok(()) => ToolResult::ok(format!("wrote source file {path}")),
            Err(e) => ToolResult::err(format!("write failed: {e}")),
        }
    }
}

/// `list_source`: list a directory relative to the repo-root anchor.
pub struct ListSourceTool {
    anchor: Arc<ProjectAnchor>,
}

impl ListSourceTool {
    /// Build against the given project anchor.
    pub fn new(anchor: Arc<ProjectAnchor>) -> Self {
        Self { anchor }
    }
}

#[async_trait]
impl Tool for ListSourceTool {
    fn name(&self) -> &str {
        "list_source"
    }
    fn description(&self) -> &str {
        "List a directory in the runtime's own source tree (repo root, not the task workspace)."
    }
    fn parameters(&self) -> serde_json::Value {
        schema_with_path(serde_json::json!({}), &[])
    }
    async fn invoke(&self, arguments: HashMap<String, serde_json::Value>) -> ToolResult {
        let path = arguments.get("path").and_then(|v| v.as_str()).unwrap_or(".").to_string();
        let resolved = match self.anchor.resolve(&path) {
            Ok(p) => p,
            Err(e) => return ToolResult::err(e.to_string()),
        };
        let mut entries = match tokio::fs::read_dir(&resolved).await {
            Ok(e) => e,
            Err(e) => return ToolResult::err(format!("list failed: {e}")),
        };
        let mut names = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => names.push(entry.file_name().to_string_lossy().to_string()),
                Ok(None) => break,
                Err(e) => return ToolResult::err(format!("list failed: {e}")),
            }
        }
        names.sort();
        ToolResult::ok(names.join("\n"))
    }
}

/// `run_tests`: shell out to the repo's test runner.
pub struct RunTestsTool {
    anchor: Arc<ProjectAnchor>,
}

impl RunTestsTool {
    /// Build against the given project anchor.
    pub fn new(anchor: Arc<ProjectAnchor>) -> Self {
        Self { anchor }
    }
}

#[async_trait]
impl Tool for RunTestsTool {
    fn name(&self) -> &str {
        "run_tests"
    }
    fn description(&self) -> &str {
        "Run the repo's test suite (`cargo test`) from the repo root."
    }
    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }
    async fn invoke(&self, _arguments: HashMap<String, serde_json::Value>) -> ToolResult {
        let output = tokio::process::Command::new("cargo").arg("test").current_dir(self.anchor.root()).output().await;
        match output {
            Ok(out) => {
                let combined = format!("{}\n{}", String::from_utf8_lossy(&out.stdout), String::from_utf8_lossy(&out.stderr));
                if out.status.success() {
                    ToolResult::ok(combined)
                } else {
                    ToolResult::err(combined)
                }
            }
            Err(e) => ToolResult::err(format!("could not launch test runner: {e}")),
        }
    }
}

/// `git_commit`: explicit commit, distinct from the registry's automatic
/// post-mutation commit (useful for committing a logical unit of several
/// prior tool calls at once).
pub struct GitCommitTool {
    git: Arc<GitCli>,
}

impl GitCommitTool {
    /// Build against the given git helper.
    pub fn new(git: Arc<GitCli>) -> Self {
        Self { git }
    }
}

#[async_trait]
impl Tool for GitCommitTool {
    fn name(&self) -> &str {
        "git_commit"
    }
    fn description(&self) -> &str {
        "Stage all pending changes and commit them with the given message."
    }
    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {"message": {"type": "string"}}, "required": ["message"]})
    }
    async fn invoke(&self, arguments: HashMap<String, serde_json::Value>) -> ToolResult {
        let message = match required_str(&arguments, "message") {
            Ok(m) => m,
            Err(e) => return ToolResult::err(e),
        };
        match self.git.commit_all(&message).await {
            Ok(()) => ToolResult::ok("committed"),
            Err(e) => ToolResult::err(format!("commit failed: {e}")),
        }
    }
}
