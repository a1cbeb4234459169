//! In-memory [`StateStore`]: a `HashMap` behind a `RwLock`, scoped by a
//! JSON-serialized composite key. No persistence across restarts; used as
//! the default backend in tests and wherever no database is configured.

use async_trait::async_trait;
use layer0::error::StateError;
use layer0::scope::Scope;
use layer0::state::{SearchResult, StateStore};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory, process-local state store.
pub struct MemoryStore {
    data: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self { data: RwLock::new(HashMap::new()) }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn composite_key(scope: &Scope, key: &str) -> String {
    format!("{}\0{key}", scope.prefix())
}

fn extract_key<'a>(composite: &'a str, scope_prefix: &str) -> Option<&'a str> {
    composite.strip_prefix(scope_prefix).and_then(|rest| rest.strip_prefix('\0'))
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn read(&self, scope: &Scope, key: &str) -> Result<Option<serde_json::Value>, StateError> {
        Ok(self.data.read().await.get(&composite_key(scope, key)).cloned())
    }

    async fn write(&self, scope: &Scope, key: &str, value: serde_json::Value) -> Result<(), StateError> {
        self.data.write().await.insert(composite_key(scope, key), value);
        Ok(())
    }

    async fn delete(&self, scope: &Scope, key: &str) -> Result<(), StateError> {
        self.data.write().await.remove(&composite_key(scope, key));
        Ok(())
    }

    async fn list(&self, scope: &Scope, prefix: &str) -> Result<Vec<String>, StateError> {
        let scope_prefix = scope.prefix();
        let data = self.data.read().await;
        Ok(data
            .keys()
            .filter_map(|ck| extract_key(ck, &scope_prefix).filter(|k| k.starts_with(prefix)).map(str::to_string))
            .collect())
    }

    async fn search(&self, _scope: &Scope, _query: &str, _limit: usize) -> Result<Vec<SearchResult>, StateError> {
        Ok(vec![])
    }
}
