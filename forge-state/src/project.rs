//! Narrow store trait over the `projects` table shape (spec.md §6), plus a
//! [`StateStore`]-backed implementation a real SQL-backed store could
//! equally satisfy. Keyed in [`Scope::Global`] since projects aren't
//! scoped to a session.

use async_trait::async_trait;
use forge_types::Project;
use layer0::error::StateError;
use layer0::id::ProjectId;
use layer0::scope::Scope;
use layer0::state::StateStore;
use std::sync::Arc;

const PROJECT_PREFIX: &str = "project:";
const SLUG_INDEX_PREFIX: &str = "project_slug:";

fn key_for(id: &ProjectId) -> String {
    format!("{PROJECT_PREFIX}{id}")
}

fn slug_key_for(slug: &str) -> String {
    format!("{SLUG_INDEX_PREFIX}{slug}")
}

/// CRUD + slug lookup over [`Project`] records.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Look up a project by id.
    async fn get(&self, id: &ProjectId) -> Result<Option<Project>, StateError>;

    /// Look up a project by its unique slug (used for `#<slug>` mentions).
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Project>, StateError>;

    /// Every known project, in no particular order.
    async fn list(&self) -> Result<Vec<Project>, StateError>;

    /// Create or overwrite a project, maintaining the slug index.
    async fn save(&self, project: &Project) -> Result<(), StateError>;
}

/// A [`ProjectStore`] backed by any [`StateStore`].
pub struct KvProjectStore {
    store: Arc<dyn StateStore>,
}

impl KvProjectStore {
    /// Build a store writing into `store`.
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProjectStore for KvProjectStore {
    async fn get(&self, id: &ProjectId) -> Result<Option<Project>, StateError> {
        let Some(value) = self.store.read(&Scope::Global, &key_for(id)).await? else { return Ok(None) };
        serde_json::from_value(value).map(Some).map_err(|e| StateError::Corrupt(e.to_string()))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Project>, StateError> {
        let Some(value) = self.store.read(&Scope::Global, &slug_key_for(slug)).await? else { return Ok(None) };
        let id: String = serde_json::from_value(value).map_err(|e| StateError::Corrupt(e.to_string()))?;
        self.get(&ProjectId::new(id)).await
    }

    async fn list(&self) -> Result<Vec<Project>, StateError> {
        let keys = self.store.list(&Scope::Global, PROJECT_PREFIX).await?;
        let mut projects = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.store.read(&Scope::Global, &key).await? {
                projects.push(serde_json::from_value(value).map_err(|e| StateError::Corrupt(e.to_string()))?);
            }
        }
        Ok(projects)
    }

    async fn save(&self, project: &Project) -> Result<(), StateError> {
        let value = serde_json::to_value(project).map_err(|e| StateError::Corrupt(e.to_string()))?;
        self.store.write(&Scope::Global, &key_for(&project.id), value).await?;
        self.store
            .write(&Scope::Global, &slug_key_for(&project.slug), serde_json::Value::String(project.id.as_str().to_string()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::Utc;

    fn project(id: &str, slug: &str) -> Project {
        Project::new(id, "Demo", slug, format!("/tmp/{slug}").into(), Utc::now())
    }

    #[tokio::test]
    async fn save_then_get_roundtrips() {
        let store = KvProjectStore::new(Arc::new(MemoryStore::new()));
        store.save(&project("p1", "demo")).await.unwrap();
        let found = store.get(&ProjectId::new("p1")).await.unwrap().unwrap();
        assert_eq!(found.slug, "demo");
    }

    #[tokio::test]
    async fn slug_index_resolves_to_the_same_project() {
        let store = KvProjectStore::new(Arc::new(MemoryStore::new()));
        store.save(&project("p1", "demo")).await.unwrap();
        let found = store.get_by_slug("demo").await.unwrap().unwrap();
        assert_eq!(found.id.as_str(), "p1");
    }

    #[tokio::test]
    async fn list_returns_every_saved_project() {
        let store = KvProjectStore::new(Arc::new(MemoryStore::new()));
        store.save(&project("p1", "a")).await.unwrap();
        store.save(&project("p2", "b")).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_slug_is_none() {
        let store = KvProjectStore::new(Arc::new(MemoryStore::new()));
        assert!(store.get_by_slug("nope").await.unwrap().is_none());
    }
}
