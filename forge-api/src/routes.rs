//! Handlers for the dashboard surface (spec.md §6). Each one is a thin
//! read (or single write) against a narrow store, mirroring the
//! `StatusCode` + `Json(json!({...}))` response shape the pack's axum
//! adapter uses.

use crate::sse::sse_response;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use forge_orchestrator::Intent;
use forge_provider::Provider;
use forge_types::ScheduledItemStatus;
use layer0::id::ScheduledItemId;
use layer0::scope::Scope;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

fn internal_error(error: impl std::fmt::Display) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": error.to_string()}))).into_response()
}

/// `POST /prompt` request body.
#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    /// The raw user message.
    pub message: String,
}

/// `POST /prompt` response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptResponse {
    /// The agent's response text.
    pub human_message: String,
    /// A fresh id identifying this request, for client-side correlation.
    pub request_id: String,
    /// `"ok"` or `"error"`.
    pub outcome: &'static str,
}

pub async fn post_prompt<P: Provider + 'static>(State(state): State<Arc<AppState<P>>>, Json(request): Json<PromptRequest>) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    match state.orchestrator.run(&request.message, Intent::User).await {
        Ok(human_message) => Json(PromptResponse { human_message, request_id, outcome: "ok" }).into_response(),
        Err(error) => Json(PromptResponse { human_message: error.to_string(), request_id, outcome: "error" }).into_response(),
    }
}

pub async fn get_tasks_recent<P: Provider + 'static>(State(state): State<Arc<AppState<P>>>) -> Response {
    match state.tasks.recent(20).await {
        Ok(records) => Json(records).into_response(),
        Err(error) => internal_error(error),
    }
}

pub async fn get_tasks_upcoming<P: Provider + 'static>(State(state): State<Arc<AppState<P>>>) -> Response {
    match state.schedule.list_active_ordered().await {
        Ok(items) => {
            let tasks: Vec<_> = items.into_iter().filter(|item| item.item_type == forge_types::ScheduledItemType::Task).collect();
            Json(tasks).into_response()
        }
        Err(error) => internal_error(error),
    }
}

pub async fn post_tasks_cancel<P: Provider + 'static>(State(state): State<Arc<AppState<P>>>, Path(id): Path<String>) -> Response {
    let id = ScheduledItemId::new(id);
    match state.schedule.get(&id).await {
        Ok(Some(mut item)) => {
            item.status = ScheduledItemStatus::Cancelled;
            item.next_run_at = None;
            match state.schedule.save(&item).await {
                Ok(()) => Json(json!({"cancelled": true})).into_response(),
                Err(error) => internal_error(error),
            }
        }
        Ok(None) => (StatusCode::NOT_FOUND, Json(json!({"error": "no such scheduled item"}))).into_response(),
        Err(error) => internal_error(error),
    }
}

pub async fn get_projects<P: Provider + 'static>(State(state): State<Arc<AppState<P>>>) -> Response {
    match state.projects.list().await {
        Ok(projects) => Json(projects).into_response(),
        Err(error) => internal_error(error),
    }
}

/// `GET /improvement/status` response body.
#[derive(Debug, Serialize)]
pub struct ImprovementStatus {
    /// Whether a cycle currently holds the improvement gate.
    running: bool,
    /// The most recent recorded attempt, if any.
    last_attempt: Option<forge_types::ImprovementAttempt>,
}

pub async fn get_improvement_status<P: Provider + 'static>(State(state): State<Arc<AppState<P>>>) -> Response {
    let running = state.orchestrator.gate().is_running();
    match state.improvements.recent(1).await {
        Ok(mut attempts) => Json(ImprovementStatus { running, last_attempt: attempts.pop() }).into_response(),
        Err(error) => internal_error(error),
    }
}

const CHAT_HISTORY_LIMIT: usize = 20;

pub async fn get_chat_history<P: Provider + 'static>(State(state): State<Arc<AppState<P>>>) -> Response {
    let store = state.orchestrator.state();
    let keys = match store.list(&Scope::Global, forge_context::conversation_log::list_prefix()).await {
        Ok(keys) => keys,
        Err(error) => return internal_error(error),
    };
    let recent = forge_context::conversation_log::most_recent(keys, CHAT_HISTORY_LIMIT);

    let mut conversations = Vec::with_capacity(recent.len());
    for key in recent {
        match store.read(&Scope::Global, &key).await {
            Ok(Some(value)) => {
                if let Ok(conversation) = serde_json::from_value::<forge_types::Conversation>(value) {
                    conversations.push(conversation);
                }
            }
            Ok(None) => {}
            Err(error) => return internal_error(error),
        }
    }
    Json(conversations).into_response()
}

pub async fn get_events<P: Provider + 'static>(State(state): State<Arc<AppState<P>>>) -> Response {
    sse_response(state.events.subscribe()).into_response()
}
