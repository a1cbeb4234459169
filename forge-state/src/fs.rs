//! JSON-file-backed [`StateStore`]: one directory per scope, one
//! percent-encoded `.json` file per key. Durable across restarts without
//! an external database — the form of persistence spec.md §6 requires
//! concretely (scheduled-item survival), even though the relational store
//! itself is an external collaborator. JSON (de)serialization failures
//! map to `StateError::Corrupt` and I/O failures map to
//! `StateError::Backend`.

use async_trait::async_trait;
use layer0::error::StateError;
use layer0::scope::Scope;
use layer0::state::{SearchResult, StateStore};
use std::path::{Path, PathBuf};

/// Filesystem-backed state store rooted at a directory.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Build a store rooted at `root`. The directory is created lazily on
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn scope_dir_name(scope: &Scope) -> String {
    let json = serde_json::to_string(scope).unwrap_or_else(|_| "unknown".to_string());
    let mut hash: u64 = 5381;
    for byte in json.as_bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(*byte as u64);
    }
    format!("scope-{hash:016x}")
}

fn key_to_filename(key: &str) -> String {
    let mut encoded = String::new();
    for ch in key.chars() {
        match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => encoded.push(ch),
            _ => {
                for byte in ch.to_string().as_bytes() {
                    encoded.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    format!("{encoded}.json")
}

fn filename_to_key(filename: &str) -> Option<String> {
    let name = filename.strip_suffix(".json")?;
    let mut result = Vec::new();
    let bytes = name.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok()?;
            result.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(result).ok()
}

impl FsStore {
    fn path_for(&self, scope: &Scope, key: &str) -> PathBuf {
        self.root.join(scope_dir_name(scope)).join(key_to_filename(key))
    }

    fn dir_for(&self, scope: &Scope) -> PathBuf {
        self.root.join(scope_dir_name(scope))
    }
}

#[async_trait]
impl StateStore for FsStore {
    async fn read(&self, scope: &Scope, key: &str) -> Result<Option<serde_json::Value>, StateError> {
        let path = self.path_for(scope, key);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let value = serde_json::from_str(&contents).map_err(|e| StateError::Corrupt(e.to_string()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StateError::Backend(e.to_string())),
        }
    }

    async fn write(&self, scope: &Scope, key: &str, value: serde_json::Value) -> Result<(), StateError> {
        let dir = self.dir_for(scope);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| StateError::Backend(e.to_string()))?;
        let contents = serde_json::to_string_pretty(&value).map_err(|e| StateError::Corrupt(e.to_string()))?;
        tokio::fs::write(self.path_for(scope, key), contents).await.map_err(|e| StateError::Backend(e.to_string()))
    }

    async fn delete(&self, scope: &Scope, key: &str) -> Result<(), StateError> {
        match tokio::fs::remove_file(self.path_for(scope, key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StateError::Backend(e.to_string())),
        }
    }

    async fn list(&self, scope: &Scope, prefix: &str) -> Result<Vec<String>, StateError> {
        let dir = self.dir_for(scope);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(StateError::Backend(e.to_string())),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| StateError::Backend(e.to_string()))? {
            if let Some(filename) = entry.file_name().to_str()
                && let Some(key) = filename_to_key(filename)
                && key.starts_with(prefix)
            {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    async fn search(&self, _scope: &Scope, _query: &str, _limit: usize) -> Result<Vec<SearchResult>, StateError> {
        Ok(vec![])
    }
}

/// Open (or create) a scope-anchored directory, for callers that need to
/// place non-`StateStore` artifacts (e.g. improvement-loop worktrees)
/// alongside a project's persisted state.
pub fn scope_root(root: &Path, scope: &Scope) -> PathBuf {
    root.join(scope_dir_name(scope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use layer0::id::SessionId;

    #[test]
    fn key_encoding_roundtrips() {
        for key in ["simple", "user:name", "path/to/key", "has spaces"] {
            let filename = key_to_filename(key);
            assert_eq!(filename_to_key(&filename).as_deref(), Some(key));
        }
    }

    #[tokio::test]
    async fn write_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let scope = Scope::Global;
        store.write(&scope, "key1", serde_json::json!("hello")).await.unwrap();
        assert_eq!(store.read(&scope, "key1").await.unwrap(), Some(serde_json::json!("hello")));
    }

    #[tokio::test]
    async fn read_missing_key_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        assert_eq!(store.read(&Scope::Global, "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn scopes_are_isolated_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let global = Scope::Global;
        let session = Scope::Session(SessionId::new("s1"));
        store.write(&global, "key", serde_json::json!("g")).await.unwrap();
        store.write(&session, "key", serde_json::json!("s")).await.unwrap();
        assert_eq!(store.read(&global, "key").await.unwrap(), Some(serde_json::json!("g")));
        assert_eq!(store.read(&session, "key").await.unwrap(), Some(serde_json::json!("s")));
    }

    #[tokio::test]
    async fn list_under_nonexistent_scope_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        assert!(store.list(&Scope::Global, "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn persists_across_store_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FsStore::new(dir.path());
            store.write(&Scope::Global, "durable", serde_json::json!(42)).await.unwrap();
        }
        let reopened = FsStore::new(dir.path());
        assert_eq!(reopened.read(&Scope::Global, "durable").await.unwrap(), Some(serde_json::json!(42)));
    }
}
