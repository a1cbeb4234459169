//! The state protocol — how data persists and is retrieved across turns.
//!
//! Deliberately minimal: CRUD + prefix listing + best-effort search.
//! The durable, relational store (§6 of the design doc: conversations,
//! tasks, knowledge, projects, improvement_attempts, scheduled_items) is an
//! external collaborator; this trait is what the in-process components
//! (orchestrator, autonomous loop, improvement loop) see and what the
//! in-memory test double implements.

use crate::error::StateError;
use crate::scope::Scope;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Key-value state, scoped, with best-effort semantic search.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read a value by key within a scope. `None` if the key doesn't exist.
    async fn read(&self, scope: &Scope, key: &str) -> Result<Option<serde_json::Value>, StateError>;

    /// Write a value. Creates or overwrites.
    async fn write(&self, scope: &Scope, key: &str, value: serde_json::Value) -> Result<(), StateError>;

    /// Delete a value. No-op if the key doesn't exist.
    async fn delete(&self, scope: &Scope, key: &str) -> Result<(), StateError>;

    /// List keys under a prefix within a scope.
    async fn list(&self, scope: &Scope, prefix: &str) -> Result<Vec<String>, StateError>;

    /// Semantic search within a scope. Implementations that don't support
    /// search return an empty vec, never an error.
    async fn search(&self, scope: &Scope, query: &str, limit: usize) -> Result<Vec<SearchResult>, StateError>;
}

/// A search result from a state store query.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The key that matched.
    pub key: String,
    /// Relevance score (higher is more relevant); for embedding-backed
    /// search this is a distance, smaller-is-better — implementations
    /// document their own convention.
    pub score: f64,
    /// Preview/snippet of the matched content.
    pub snippet: Option<String>,
}

impl SearchResult {
    /// Create a new search result with no snippet.
    pub fn new(key: impl Into<String>, score: f64) -> Self {
        Self { key: key.into(), score, snippet: None }
    }
}
