//! Append-only log backing `GET /tasks/recent`. `TaskSpec` itself carries
//! no timestamp, so finished tasks are wrapped in a [`TaskRecord`] and
//! keyed by completion time the same way [`crate::improvement`] orders
//! attempts — the executor has no reason to know about this log, so the
//! orchestrator appends to it itself once a dispatched task reaches a
//! terminal state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forge_types::TaskSpec;
use layer0::error::StateError;
use layer0::id::PlanId;
use layer0::scope::Scope;
use layer0::state::StateStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const PREFIX: &str = "task_log:";

/// One finished [`TaskSpec`], stamped with the plan it belonged to and
/// when it reached a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// The plan this task was a node of.
    pub plan_id: PlanId,
    /// The task itself, in its terminal (`Done` or `Failed`) state.
    pub task: TaskSpec,
    /// When the task reached that terminal state.
    pub finished_at: DateTime<Utc>,
}

fn key_for(record: &TaskRecord) -> String {
    format!("{PREFIX}{:020}:{}", record.finished_at.timestamp_millis(), record.task.id)
}

/// Append-only log of finished tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Append one finished task.
    async fn append(&self, record: &TaskRecord) -> Result<(), StateError>;

    /// The `n` most recently finished tasks, most recent first.
    async fn recent(&self, n: usize) -> Result<Vec<TaskRecord>, StateError>;
}

/// A [`TaskStore`] backed by any [`StateStore`].
pub struct KvTaskStore {
    store: Arc<dyn StateStore>,
}

impl KvTaskStore {
    /// Build a store writing into `store`.
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TaskStore for KvTaskStore {
    async fn append(&self, record: &TaskRecord) -> Result<(), StateError> {
        let value = serde_json::to_value(record).map_err(|e| StateError::Corrupt(e.to_string()))?;
        self.store.write(&Scope::Global, &key_for(record), value).await
    }

    async fn recent(&self, n: usize) -> Result<Vec<TaskRecord>, StateError> {
        let mut keys = self.store.list(&Scope::Global, PREFIX).await?;
        keys.sort();
        keys.reverse();
        keys.truncate(n);

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.store.read(&Scope::Global, &key).await? {
                records.push(serde_json::from_value(value).map_err(|e| StateError::Corrupt(e.to_string()))?);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::Duration;
    use forge_types::TaskStatus;

    fn record(id: &str, finished_at: DateTime<Utc>) -> TaskRecord {
        let mut task = TaskSpec::new(id, "t", "d", "coder", vec![]);
        task.status = TaskStatus::Done;
        task.result = Some("ok".into());
        TaskRecord { plan_id: PlanId::new("p1"), task, finished_at }
    }

    #[tokio::test]
    async fn recent_returns_most_recent_first() {
        let store = KvTaskStore::new(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        store.append(&record("t1", now)).await.unwrap();
        store.append(&record("t2", now + Duration::seconds(1))).await.unwrap();

        let recent = store.recent(5).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].task.id.as_str(), "t2");
    }

    #[tokio::test]
    async fn recent_respects_the_limit() {
        let store = KvTaskStore::new(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        for i in 0..5 {
            store.append(&record(&format!("t{i}"), now + Duration::seconds(i))).await.unwrap();
        }
        assert_eq!(store.recent(2).await.unwrap().len(), 2);
    }
}
