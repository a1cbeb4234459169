//! Narrow store trait over the `improvement_attempts` table shape
//! (spec.md §6): an append-only, timestamp-ordered log, keyed the same
//! way `forge-context::conversation_log` orders conversations, so
//! `/improvements [N]` and `GET /improvement/status` are a `list` + tail.

use async_trait::async_trait;
use forge_types::ImprovementAttempt;
use layer0::error::StateError;
use layer0::scope::Scope;
use layer0::state::StateStore;
use std::sync::Arc;

const PREFIX: &str = "improvement:";

fn key_for(attempt: &ImprovementAttempt) -> String {
    format!("{PREFIX}{:020}:{}", attempt.created_at.timestamp_millis(), attempt.id)
}

/// Append-only log of [`ImprovementAttempt`] records.
#[async_trait]
pub trait ImprovementStore: Send + Sync {
    /// Append one attempt record.
    async fn append(&self, attempt: &ImprovementAttempt) -> Result<(), StateError>;

    /// The `n` most recent attempts, most recent first.
    async fn recent(&self, n: usize) -> Result<Vec<ImprovementAttempt>, StateError>;
}

/// An [`ImprovementStore`] backed by any [`StateStore`].
pub struct KvImprovementStore {
    store: Arc<dyn StateStore>,
}

impl KvImprovementStore {
    /// Build a store writing into `store`.
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ImprovementStore for KvImprovementStore {
    async fn append(&self, attempt: &ImprovementAttempt) -> Result<(), StateError> {
        let value = serde_json::to_value(attempt).map_err(|e| StateError::Corrupt(e.to_string()))?;
        self.store.write(&Scope::Global, &key_for(attempt), value).await
    }

    async fn recent(&self, n: usize) -> Result<Vec<ImprovementAttempt>, StateError> {
        let mut keys = self.store.list(&Scope::Global, PREFIX).await?;
        keys.sort();
        keys.reverse();
        keys.truncate(n);

        let mut attempts = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.store.read(&Scope::Global, &key).await? {
                attempts.push(serde_json::from_value(value).map_err(|e| StateError::Corrupt(e.to_string()))?);
            }
        }
        Ok(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::{Duration, Utc};

    fn attempt(id: &str, cycle: u64, created_at: chrono::DateTime<Utc>) -> ImprovementAttempt {
        ImprovementAttempt {
            id: layer0::id::ImprovementAttemptId::new(id),
            cycle,
            branch: format!("improve/{cycle}"),
            changed_paths: vec![],
            merged: false,
            tokens_used: 0,
            error: None,
            created_at,
        }
    }

    #[tokio::test]
    async fn recent_returns_most_recent_first() {
        let store = KvImprovementStore::new(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        store.append(&attempt("a1", 1, now)).await.unwrap();
        store.append(&attempt("a2", 2, now + Duration::seconds(1))).await.unwrap();
        store.append(&attempt("a3", 3, now + Duration::seconds(2))).await.unwrap();

        let recent = store.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].cycle, 3);
        assert_eq!(recent[1].cycle, 2);
    }

    #[tokio::test]
    async fn recent_on_empty_store_is_empty() {
        let store = KvImprovementStore::new(Arc::new(MemoryStore::new()));
        assert!(store.recent(5).await.unwrap().is_empty());
    }
}
