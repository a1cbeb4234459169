use forge_sandbox::Sandbox;
use forge_tool::builtin::{CheckPathTool, ListFilesTool, ReadFileTool, WriteFileTool};
use forge_tool::{Tool, ToolRegistry};
use std::collections::HashMap;
use std::sync::Arc;

fn args(pairs: &[(&str, &str)]) -> HashMap<String, serde_json::Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), serde_json::json!(v))).collect()
}

#[tokio::test]
async fn write_then_read_round_trips() {
    let tmp = tempfile::tempdir().unwrap();
    let sandbox = Arc::new(Sandbox::new(tmp.path()));

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(WriteFileTool::new(sandbox.clone())));
    registry.register(Arc::new(ReadFileTool::new(sandbox.clone())));

    let write = registry.invoke("write_file", args(&[("path", "a.txt"), ("content", "hello")])).await;
    assert!(write.success);

    let read = registry.invoke("read_file", args(&[("path", "a.txt")])).await;
    assert!(read.success);
    assert_eq!(read.output, "hello");
}

#[tokio::test]
async fn read_missing_file_gets_enriched_error() {
    let tmp = tempfile::tempdir().unwrap();
    let sandbox = Arc::new(Sandbox::new(tmp.path()));

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ReadFileTool::new(sandbox)));

    let result = registry.invoke("read_file", args(&[("path", "missing.txt")])).await;
    assert!(!result.success);
    let err = result.error.unwrap();
    assert!(err.contains("raw path"));
    assert!(err.contains("list_files/check_path first"));
}

#[tokio::test]
async fn path_escape_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let sandbox = Arc::new(Sandbox::new(tmp.path()));
    let tool = ReadFileTool::new(sandbox);

    let result = tool.invoke(args(&[("path", "../../etc/passwd")])).await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("escapes workspace root"));
}

#[tokio::test]
async fn check_path_reports_absent_file_and_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let sandbox = Arc::new(Sandbox::new(tmp.path()));
    std::fs::create_dir(tmp.path().join("subdir")).unwrap();
    let tool = CheckPathTool::new(sandbox);

    assert_eq!(tool.invoke(args(&[("path", "nope.txt")])).await.output, "absent");
    assert_eq!(tool.invoke(args(&[("path", "subdir")])).await.output, "directory");
}

#[tokio::test]
async fn list_files_sorted() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("b.txt"), "").unwrap();
    std::fs::write(tmp.path().join("a.txt"), "").unwrap();
    let sandbox = Arc::new(Sandbox::new(tmp.path()));
    let tool = ListFilesTool::new(sandbox);

    let result = tool.invoke(args(&[("path", ".")])).await;
    assert_eq!(result.output, "a.txt\nb.txt");
}
