//! Shared state handed to every axum handler via [`axum::extract::State`].

use crate::sse::EventBridge;
use forge_orchestrator::Orchestrator;
use forge_provider::Provider;
use forge_state::{ImprovementStore, ProjectStore, ScheduleStore, TaskStore};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Everything a handler needs: the orchestrator plus the narrow stores the
/// dashboard reads directly rather than going through `run`.
pub struct AppState<P: Provider + 'static> {
    pub(crate) orchestrator: Arc<Orchestrator<P>>,
    pub(crate) tasks: Arc<dyn TaskStore>,
    pub(crate) schedule: Arc<dyn ScheduleStore>,
    pub(crate) projects: Arc<dyn ProjectStore>,
    pub(crate) improvements: Arc<dyn ImprovementStore>,
    pub(crate) events: broadcast::Sender<forge_types::BusEvent>,
}

impl<P: Provider + 'static> AppState<P> {
    /// Build app state and subscribe a bridge to `bus` under the wildcard
    /// pattern so `/events` has something to stream.
    pub async fn new(
        orchestrator: Arc<Orchestrator<P>>,
        tasks: Arc<dyn TaskStore>,
        schedule: Arc<dyn ScheduleStore>,
        projects: Arc<dyn ProjectStore>,
        improvements: Arc<dyn ImprovementStore>,
        bus: &forge_bus::Bus,
    ) -> Self {
        let (sender, _receiver) = broadcast::channel(256);
        bus.subscribe("*", Arc::new(EventBridge::new(sender.clone()))).await;
        Self { orchestrator, tasks, schedule, projects, improvements, events: sender }
    }
}
