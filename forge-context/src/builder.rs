//! Assembles the orchestrator's memory context (spec.md §4.6 step 3):
//! recent conversation history, semantically similar prior snippets, and
//! accumulated knowledge, concatenated into one prompt-ready string.

use crate::{conversation_log, knowledge};
use forge_types::Conversation;
use layer0::scope::Scope;
use layer0::state::StateStore;
use std::sync::Arc;

/// Tunables for [`MemoryContextBuilder::build`].
#[derive(Debug, Clone, Copy)]
pub struct ContextConfig {
    /// How many of the most recent conversations to include.
    pub recent_conversations: usize,
    /// How many semantically similar snippets to include.
    pub semantic_top_k: usize,
    /// Snippets whose search score is at or above this distance are
    /// dropped. Smaller is more similar, per
    /// [`StateStore::search`]'s documented convention.
    pub semantic_distance_threshold: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self { recent_conversations: 5, semantic_top_k: 3, semantic_distance_threshold: 1.2 }
    }
}

/// Builds memory context by reading a [`StateStore`] scope. Degrades
/// gracefully: a backend that can't search returns no semantic snippets
/// rather than an error (per `StateStore::search`'s contract), and a
/// missing/corrupt conversation or knowledge entry is skipped rather than
/// failing the whole build.
pub struct MemoryContextBuilder {
    store: Arc<dyn StateStore>,
    config: ContextConfig,
}

impl MemoryContextBuilder {
    /// Build a context assembler reading from `store` with the default
    /// [`ContextConfig`].
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store, config: ContextConfig::default() }
    }

    /// Override the default tunables.
    pub fn with_config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    /// Assemble memory context for `query` within `scope`. `scope` is
    /// typically the active project's scope, or [`Scope::Global`] outside
    /// any project.
    pub async fn build(&self, scope: &Scope, query: &str) -> String {
        let recent = self.recent_conversations(scope).await;
        let semantic = self.semantic_snippets(scope, query).await;
        let knowledge = self.knowledge_entries(scope).await;
        format_context(&recent, &semantic, &knowledge)
    }

    async fn recent_conversations(&self, scope: &Scope) -> Vec<Conversation> {
        let keys = match self.store.list(scope, conversation_log::list_prefix()).await {
            Ok(keys) => keys,
            Err(error) => {
                tracing::warn!(%error, "failed to list conversation keys, proceeding without history");
                return Vec::new();
            }
        };
        let recent_keys = conversation_log::most_recent(keys, self.config.recent_conversations);
        let mut out = Vec::with_capacity(recent_keys.len());
        for key in recent_keys {
            match self.store.read(scope, &key).await {
                Ok(Some(value)) => match serde_json::from_value::<Conversation>(value) {
                    Ok(conv) => out.push(conv),
                    Err(error) => tracing::warn!(%error, %key, "skipping unparseable conversation record"),
                },
                Ok(None) => {}
                Err(error) => tracing::warn!(%error, %key, "failed to read conversation record"),
            }
        }
        out
    }

    async fn semantic_snippets(&self, scope: &Scope, query: &str) -> Vec<String> {
        let results = match self.store.search(scope, query, self.config.semantic_top_k).await {
            Ok(results) => results,
            Err(error) => {
                tracing::warn!(%error, "semantic search failed, proceeding without it");
                return Vec::new();
            }
        };
        results
            .into_iter()
            .filter(|result| result.score < self.config.semantic_distance_threshold)
            .filter_map(|result| result.snippet)
            .collect()
    }

    async fn knowledge_entries(&self, scope: &Scope) -> Vec<(String, serde_json::Value)> {
        let keys = match self.store.list(scope, knowledge::list_prefix()).await {
            Ok(keys) => keys,
            Err(error) => {
                tracing::warn!(%error, "failed to list knowledge keys, proceeding without it");
                return Vec::new();
            }
        };
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            if let Ok(Some(value)) = self.store.read(scope, &key).await {
                out.push((knowledge::strip_prefix(&key).to_string(), value));
            }
        }
        out
    }
}

/// Pure formatting: concatenates the three context sources, most-recent
/// conversation last, blank-line separated, omitting any empty section.
fn format_context(recent: &[Conversation], semantic: &[String], knowledge: &[(String, serde_json::Value)]) -> String {
    let mut sections = Vec::new();

    if !recent.is_empty() {
        let block = recent
            .iter()
            .map(|conv| format!("User: {}\nAssistant: {}", conv.user_msg, conv.agent_msg))
            .collect::<Vec<_>>()
            .join("\n\n");
        sections.push(block);
    }

    if !semantic.is_empty() {
        let block = semantic.iter().map(|snippet| format!("Related: {snippet}")).collect::<Vec<_>>().join("\n");
        sections.push(block);
    }

    if !knowledge.is_empty() {
        let block = knowledge.iter().map(|(key, value)| format!("{key}: {value}")).collect::<Vec<_>>().join("\n");
        sections.push(block);
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use layer0::error::StateError;
    use layer0::state::SearchResult;
    use std::collections::HashMap;
    use tokio::sync::Mutex as AsyncMutex;

    struct FakeStore {
        values: AsyncMutex<HashMap<String, serde_json::Value>>,
        search_results: Vec<SearchResult>,
    }

    fn composite(scope: &Scope, key: &str) -> String {
        format!("{}::{key}", scope.prefix())
    }

    #[async_trait]
    impl StateStore for FakeStore {
        async fn read(&self, scope: &Scope, key: &str) -> Result<Option<serde_json::Value>, StateError> {
            Ok(self.values.lock().await.get(&composite(scope, key)).cloned())
        }

        async fn write(&self, scope: &Scope, key: &str, value: serde_json::Value) -> Result<(), StateError> {
            self.values.lock().await.insert(composite(scope, key), value);
            Ok(())
        }

        async fn delete(&self, scope: &Scope, key: &str) -> Result<(), StateError> {
            self.values.lock().await.remove(&composite(scope, key));
            Ok(())
        }

        async fn list(&self, scope: &Scope, prefix: &str) -> Result<Vec<String>, StateError> {
            let full_prefix = composite(scope, prefix);
            Ok(self
                .values
                .lock()
                .await
                .keys()
                .filter(|k| k.starts_with(&full_prefix))
                .map(|k| k.split("::").next_back().unwrap().to_string())
                .collect())
        }

        async fn search(&self, _scope: &Scope, _query: &str, limit: usize) -> Result<Vec<SearchResult>, StateError> {
            Ok(self.search_results.iter().take(limit).cloned().collect())
        }
    }

    fn conv(user: &str, agent: &str, millis: i64) -> Conversation {
        use chrono::TimeZone;
        Conversation::new(
            layer0::id::ConversationId::new(format!("{user}-{millis}")),
            chrono::Utc.timestamp_millis_opt(millis).unwrap(),
            user.to_string(),
            agent.to_string(),
            serde_json::json!({}),
        )
    }

    #[tokio::test]
    async fn builds_concatenated_sections() {
        let scope = Scope::Global;
        let mut values = HashMap::new();
        let c1 = conv("hello", "hi there", 1_000);
        let c2 = conv("what's next", "let's ship it", 2_000);
        values.insert(format!("{}::{}", scope.prefix(), conversation_log::key_for(&c1)), serde_json::to_value(&c1).unwrap());
        values.insert(format!("{}::{}", scope.prefix(), conversation_log::key_for(&c2)), serde_json::to_value(&c2).unwrap());
        values.insert(format!("{}::{}", scope.prefix(), knowledge::key_for("preferred_style")), serde_json::json!("terse"));

        let store: Arc<dyn StateStore> = Arc::new(FakeStore {
            values: AsyncMutex::new(values),
            search_results: vec![{
                let mut r = SearchResult::new("k", 0.5);
                r.snippet = Some("prior note".into());
                r
            }],
        });

        let builder = MemoryContextBuilder::new(store);
        let context = builder.build(&scope, "ship it").await;

        assert!(context.contains("User: hello\nAssistant: hi there"));
        assert!(context.contains("User: what's next\nAssistant: let's ship it"));
        assert!(context.contains("Related: prior note"));
        assert!(context.contains("preferred_style: \"terse\""));

        let hello_pos = context.find("hello").unwrap();
        let next_pos = context.find("what's next").unwrap();
        assert!(hello_pos < next_pos, "most recent conversation should come last");
    }

    #[tokio::test]
    async fn distance_threshold_filters_far_snippets() {
        let scope = Scope::Global;
        let store: Arc<dyn StateStore> = Arc::new(FakeStore {
            values: AsyncMutex::new(HashMap::new()),
            search_results: vec![
                {
                    let mut r = SearchResult::new("near", 0.9);
                    r.snippet = Some("close match".into());
                    r
                },
                {
                    let mut r = SearchResult::new("far", 1.5);
                    r.snippet = Some("unrelated".into());
                    r
                },
            ],
        });

        let context = MemoryContextBuilder::new(store).build(&scope, "q").await;
        assert!(context.contains("close match"));
        assert!(!context.contains("unrelated"));
    }

    #[tokio::test]
    async fn empty_store_produces_empty_context() {
        let scope = Scope::Global;
        let store: Arc<dyn StateStore> =
            Arc::new(FakeStore { values: AsyncMutex::new(HashMap::new()), search_results: vec![] });
        let context = MemoryContextBuilder::new(store).build(&scope, "q").await;
        assert_eq!(context, "");
    }
}
