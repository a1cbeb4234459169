//! Narrow store trait over the `scheduled_items` table shape (spec.md
//! §6), with the "partial index on `next_run_at WHERE status='active'`"
//! expressed as an in-application filter+sort over [`ScheduleStore::list`]
//! rather than a real index, since this backend has no query planner.

use async_trait::async_trait;
use forge_types::{ScheduledItem, ScheduledItemStatus};
use layer0::error::StateError;
use layer0::id::ScheduledItemId;
use layer0::scope::Scope;
use layer0::state::StateStore;
use std::sync::Arc;

const PREFIX: &str = "schedule:";

fn key_for(id: &ScheduledItemId) -> String {
    format!("{PREFIX}{id}")
}

/// CRUD over [`ScheduledItem`] records, plus the "due, active, ordered"
/// query both background loops need.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Look up one item by id.
    async fn get(&self, id: &ScheduledItemId) -> Result<Option<ScheduledItem>, StateError>;

    /// Every scheduled item, in no particular order.
    async fn list(&self) -> Result<Vec<ScheduledItem>, StateError>;

    /// Every `Active` item, ordered by `next_run_at` ascending. Items with
    /// no `next_run_at` (shouldn't happen for `Active` items, but treated
    /// defensively) sort last.
    async fn list_active_ordered(&self) -> Result<Vec<ScheduledItem>, StateError> {
        let mut active: Vec<ScheduledItem> = self.list().await?.into_iter().filter(|i| i.status == ScheduledItemStatus::Active).collect();
        active.sort_by_key(|i| i.next_run_at.unwrap_or_else(|| chrono::DateTime::<chrono::Utc>::MAX_UTC));
        Ok(active)
    }

    /// Create or overwrite a scheduled item.
    async fn save(&self, item: &ScheduledItem) -> Result<(), StateError>;

    /// Remove a scheduled item entirely (`/schedule cancel` could instead
    /// set `status = Cancelled` via `save`; this is for callers that want
    /// it gone).
    async fn delete(&self, id: &ScheduledItemId) -> Result<(), StateError>;
}

/// A [`ScheduleStore`] backed by any [`StateStore`].
pub struct KvScheduleStore {
    store: Arc<dyn StateStore>,
}

impl KvScheduleStore {
    /// Build a store writing into `store`.
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ScheduleStore for KvScheduleStore {
    async fn get(&self, id: &ScheduledItemId) -> Result<Option<ScheduledItem>, StateError> {
        let Some(value) = self.store.read(&Scope::Global, &key_for(id)).await? else { return Ok(None) };
        serde_json::from_value(value).map(Some).map_err(|e| StateError::Corrupt(e.to_string()))
    }

    async fn list(&self) -> Result<Vec<ScheduledItem>, StateError> {
        let keys = self.store.list(&Scope::Global, PREFIX).await?;
        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.store.read(&Scope::Global, &key).await? {
                items.push(serde_json::from_value(value).map_err(|e| StateError::Corrupt(e.to_string()))?);
            }
        }
        Ok(items)
    }

    async fn save(&self, item: &ScheduledItem) -> Result<(), StateError> {
        let value = serde_json::to_value(item).map_err(|e| StateError::Corrupt(e.to_string()))?;
        self.store.write(&Scope::Global, &key_for(&item.id), value).await
    }

    async fn delete(&self, id: &ScheduledItemId) -> Result<(), StateError> {
        self.store.delete(&Scope::Global, &key_for(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::{Duration, Utc};
    use forge_types::RecurrenceSpec;

    fn item(id: &str, next_run_at: Option<chrono::DateTime<Utc>>) -> ScheduledItem {
        ScheduledItem::new(id, forge_types::ScheduledItemType::Reminder, "t", "d", RecurrenceSpec::Once { at: Utc::now() }, next_run_at, Utc::now())
    }

    #[tokio::test]
    async fn save_then_get_roundtrips() {
        let store = KvScheduleStore::new(Arc::new(MemoryStore::new()));
        store.save(&item("s1", Some(Utc::now()))).await.unwrap();
        assert!(store.get(&ScheduledItemId::new("s1")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_active_ordered_sorts_by_next_run_at_and_excludes_inactive() {
        let store = KvScheduleStore::new(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        let mut later = item("s-later", Some(now + Duration::minutes(10)));
        let mut sooner = item("s-sooner", Some(now + Duration::minutes(1)));
        let mut done = item("s-done", None);
        done.status = ScheduledItemStatus::Done;
        later.status = ScheduledItemStatus::Active;
        sooner.status = ScheduledItemStatus::Active;
        store.save(&later).await.unwrap();
        store.save(&sooner).await.unwrap();
        store.save(&done).await.unwrap();

        let ordered = store.list_active_ordered().await.unwrap();
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0].id.as_str(), "s-sooner");
        assert_eq!(ordered[1].id.as_str(), "s-later");
    }

    #[tokio::test]
    async fn delete_removes_the_item() {
        let store = KvScheduleStore::new(Arc::new(MemoryStore::new()));
        store.save(&item("s1", None)).await.unwrap();
        store.delete(&ScheduledItemId::new("s1")).await.unwrap();
        assert!(store.get(&ScheduledItemId::new("s1")).await.unwrap().is_none());
    }
}
