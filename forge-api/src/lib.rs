#![deny(missing_docs)]
//! The minimal HTTP/SSE surface an external dashboard consumes (spec.md
//! §6) — not part of the core itself, but a thin read (and one write:
//! `POST /prompt`) layer over the same narrow stores the CLI and
//! background loops already use.
//!
//! Grounded in the pack's axum adapter
//! (`examples/CloudLLM-ai-cloudllm/src/cloudllm/mcp_http_adapter.rs`):
//! a `Router` of plain handler functions returning `StatusCode` +
//! `Json(json!({...}))`, bound with `TcpListener` + `axum::serve` by the
//! embedding binary.

mod routes;
mod sse;
mod state;

pub use state::AppState;

use axum::Router;
use axum::routing::{get, post};
use forge_provider::Provider;
use std::sync::Arc;

/// Build the router serving spec.md §6's dashboard surface. The caller
/// binds it to a listener with `axum::serve`.
pub fn router<P: Provider + 'static>(state: Arc<AppState<P>>) -> Router {
    Router::new()
        .route("/prompt", post(routes::post_prompt::<P>))
        .route("/tasks/recent", get(routes::get_tasks_recent::<P>))
        .route("/tasks/upcoming", get(routes::get_tasks_upcoming::<P>))
        .route("/tasks/{id}/cancel", post(routes::post_tasks_cancel::<P>))
        .route("/projects", get(routes::get_projects::<P>))
        .route("/improvement/status", get(routes::get_improvement_status::<P>))
        .route("/chat/history", get(routes::get_chat_history::<P>))
        .route("/events", get(routes::get_events::<P>))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use forge_bus::Bus;
    use forge_orchestrator::{ImprovementGate, RuntimeConfig};
    use forge_provider::testing::ScriptedProvider;
    use forge_sandbox::Sandbox;
    use forge_state::memory::MemoryStore;
    use forge_state::{KvImprovementStore, KvProjectStore, KvScheduleStore, KvTaskStore, ProjectStore};
    use forge_types::{Project, RecurrenceSpec, ScheduledItem, ScheduledItemType};
    use http_body_util::BodyExt;
    use layer0::id::ProjectId;
    use layer0::state::StateStore;
    use std::env::temp_dir;
    use tower::ServiceExt;

    async fn build(provider: ScriptedProvider) -> (Arc<AppState<ScriptedProvider>>, Arc<dyn forge_state::ScheduleStore>) {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let projects: Arc<dyn ProjectStore> = Arc::new(KvProjectStore::new(store.clone()));
        let schedule: Arc<dyn forge_state::ScheduleStore> = Arc::new(KvScheduleStore::new(store.clone()));
        let improvements: Arc<dyn forge_state::ImprovementStore> = Arc::new(KvImprovementStore::new(store.clone()));
        let tasks: Arc<dyn forge_state::TaskStore> = Arc::new(KvTaskStore::new(store.clone()));
        let bus = Arc::new(Bus::new());

        let orchestrator = Arc::new(forge_orchestrator::Orchestrator::new(
            Arc::new(provider),
            Arc::new(forge_tool::ToolRegistry::new()),
            Arc::new(Sandbox::new(temp_dir())),
            bus.clone(),
            store,
            projects.clone(),
            Arc::new(ImprovementGate::new()),
            RuntimeConfig::default(),
        ));

        let state = Arc::new(AppState::new(orchestrator, tasks, schedule.clone(), projects, improvements, &bus).await);
        (state, schedule)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn post_prompt_returns_the_orchestrator_response() {
        let (state, _schedule) = build(ScriptedProvider::single_text("hello there")).await;
        let app = router(state);

        let request = Request::builder()
            .method("POST")
            .uri("/prompt")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&serde_json::json!({"message": "hi"})).unwrap()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["outcome"], "ok");
        assert!(body["humanMessage"].as_str().unwrap().contains("hello there"));
        assert!(body["requestId"].is_string());
    }

    #[tokio::test]
    async fn get_projects_lists_saved_projects() {
        let (state, _schedule) = build(ScriptedProvider::single_text("hi")).await;
        let project = Project::new(ProjectId::new("proj-1"), "Demo", "demo", temp_dir(), chrono::Utc::now());
        state.projects.save(&project).await.unwrap();

        let app = router(state);
        let request = Request::builder().uri("/projects").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["slug"], "demo");
    }

    #[tokio::test]
    async fn tasks_upcoming_excludes_reminder_items() {
        let (state, schedule) = build(ScriptedProvider::single_text("hi")).await;
        let task = ScheduledItem::new("task-1", ScheduledItemType::Task, "t", "d", RecurrenceSpec::Interval { minutes: 60 }, Some(chrono::Utc::now()), chrono::Utc::now());
        let reminder = ScheduledItem::new("rem-1", ScheduledItemType::Reminder, "r", "d", RecurrenceSpec::Interval { minutes: 60 }, Some(chrono::Utc::now()), chrono::Utc::now());
        schedule.save(&task).await.unwrap();
        schedule.save(&reminder).await.unwrap();

        let app = router(state);
        let request = Request::builder().uri("/tasks/upcoming").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let body = body_json(response).await;
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "task-1");
    }

    #[tokio::test]
    async fn cancel_sets_status_and_clears_next_run() {
        let (state, schedule) = build(ScriptedProvider::single_text("hi")).await;
        let item = ScheduledItem::new("task-1", ScheduledItemType::Task, "t", "d", RecurrenceSpec::Interval { minutes: 60 }, Some(chrono::Utc::now()), chrono::Utc::now());
        schedule.save(&item).await.unwrap();

        let app = router(state);
        let request = Request::builder().method("POST").uri("/tasks/task-1/cancel").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let updated = schedule.get(&item.id).await.unwrap().unwrap();
        assert_eq!(updated.status, forge_types::ScheduledItemStatus::Cancelled);
        assert!(updated.next_run_at.is_none());
    }

    #[tokio::test]
    async fn improvement_status_reports_idle_with_no_attempts() {
        let (state, _schedule) = build(ScriptedProvider::single_text("hi")).await;
        let app = router(state);
        let request = Request::builder().uri("/improvement/status").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["running"], false);
        assert!(body["last_attempt"].is_null());
    }
}
