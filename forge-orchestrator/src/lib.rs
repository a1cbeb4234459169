#![deny(missing_docs)]
//! The seven-step request pipeline (spec.md §4.6) that wires every other
//! component together: the improvement-gate wait, project-mention
//! switching, memory-context assembly, direct/planned mode selection,
//! dispatch through the agent runner or the plan executor, synthesis of a
//! multi-task plan's results, and durable persistence of the turn.
//!
//! [`Orchestrator`] is the one type in the workspace generic over a
//! concrete [`Provider`] that also holds every other collaborator —
//! the background loops (autonomous, improvement) and the outer surfaces
//! (CLI, API) each hold one `Arc<Orchestrator<P>>` and call [`Orchestrator::run`].

pub mod config;
pub mod gate;
pub mod mention;
pub mod mode;

pub use config::RuntimeConfig;
pub use gate::ImprovementGate;

use chrono::Utc;
use forge_agent::{AgentContext, AgentRunner, RegistryRunner};
use forge_bus::Bus;
use forge_context::{conversation_log, knowledge, MemoryContextBuilder};
use forge_executor::Executor;
use forge_planner::create_plan;
use forge_provider::{EmbedError, Provider};
use forge_sandbox::Sandbox;
use forge_state::ProjectStore;
use forge_tool::ToolRegistry;
use forge_types::{Conversation, Plan, TaskStatus};
use layer0::error::OrchError;
use layer0::id::{ConversationId, ProjectId, TaskId};
use layer0::scope::Scope;
use layer0::state::StateStore;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Why a request is being run, controlling the improvement-gate wait and
/// the metadata a conversation is tagged with (spec.md §4.6, §4.8, §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// A request typed by an interactive user (CLI/API).
    User,
    /// A request the improvement loop generated for itself.
    Improvement,
    /// A request the autonomous loop generated from a scheduled item or
    /// project objective.
    Autonomous,
}

impl Intent {
    fn label(self) -> &'static str {
        match self {
            Intent::User => "user",
            Intent::Improvement => "improvement",
            Intent::Autonomous => "autonomous",
        }
    }
}

/// The request pipeline. One instance is shared (behind an `Arc`) across
/// the CLI/API front door and both background loops.
pub struct Orchestrator<P: Provider> {
    provider: Arc<P>,
    runner: Arc<dyn AgentRunner>,
    sandbox: Arc<Sandbox>,
    bus: Arc<Bus>,
    state: Arc<dyn StateStore>,
    projects: Arc<dyn ProjectStore>,
    config: RuntimeConfig,
    gate: Arc<ImprovementGate>,
    pending_reminders: Mutex<VecDeque<String>>,
    active_project: RwLock<Option<ProjectId>>,
    last_user_activity: RwLock<chrono::DateTime<Utc>>,
    last_run_tokens: AtomicU64,
}

impl<P: Provider + 'static> Orchestrator<P> {
    /// Build an orchestrator. Constructs its own [`RegistryRunner`] from
    /// `provider` and `tools` internally — callers hold the orchestrator,
    /// not the runner.
    pub fn new(
        provider: Arc<P>,
        tools: Arc<ToolRegistry>,
        sandbox: Arc<Sandbox>,
        bus: Arc<Bus>,
        state: Arc<dyn StateStore>,
        projects: Arc<dyn ProjectStore>,
        gate: Arc<ImprovementGate>,
        config: RuntimeConfig,
    ) -> Self {
        let runner = RegistryRunner::new(provider.clone(), tools, config.agent_temperature).with_max_iterations(config.agent_max_iterations);
        Self {
            provider,
            runner: Arc::new(runner),
            sandbox,
            bus,
            state,
            projects,
            config,
            gate,
            pending_reminders: Mutex::new(VecDeque::new()),
            active_project: RwLock::new(None),
            last_user_activity: RwLock::new(Utc::now()),
            last_run_tokens: AtomicU64::new(0),
        }
    }

    /// The shared improvement-cycle gate, for the improvement loop to
    /// acquire/release.
    pub fn gate(&self) -> Arc<ImprovementGate> {
        self.gate.clone()
    }

    /// The shared durable store, for collaborators that need to read
    /// conversation-log entries directly (e.g. `/history`, the autonomous
    /// loop's "last 3 conversations about this project" prompt context)
    /// rather than going through `run`.
    pub fn state(&self) -> Arc<dyn StateStore> {
        self.state.clone()
    }

    /// When a user last made a request, for the improvement loop's idle
    /// check (spec.md §4.9).
    pub async fn last_user_activity(&self) -> chrono::DateTime<Utc> {
        *self.last_user_activity.read().await
    }

    /// Tokens consumed by the most recently completed `run` call.
    pub fn last_run_tokens(&self) -> u64 {
        self.last_run_tokens.load(Ordering::SeqCst)
    }

    /// Queue a reminder for the front door to surface on its next prompt
    /// (spec.md §4.8: due reminder scheduled items).
    pub async fn push_reminder(&self, text: impl Into<String>) {
        self.pending_reminders.lock().await.push_back(text.into());
    }

    /// Drain every queued reminder.
    pub async fn pop_reminders(&self) -> Vec<String> {
        self.pending_reminders.lock().await.drain(..).collect()
    }

    /// Switch the active project and workspace root directly, bypassing
    /// `#<slug>` mention parsing — for callers that already know which
    /// project they mean, such as the autonomous loop's round-robin
    /// objective processing (spec.md §4.8 step 5).
    pub async fn set_active_project(&self, project: &forge_types::Project) {
        self.sandbox.set_root(project.workspace_path.clone());
        *self.active_project.write().await = Some(project.id.clone());
    }

    /// The currently active project scope, or [`Scope::Global`] if none is
    /// set. Front doors (CLI/API) use this to scope conversation-log reads
    /// (e.g. `/history`) the same way `run` scopes persistence.
    pub async fn active_scope(&self) -> Scope {
        match self.active_project.read().await.clone() {
            Some(id) => Scope::Project(id),
            None => Scope::Global,
        }
    }

    /// Write a freeform knowledge entry (spec.md §4.6 step 3, §4.9 step 6).
    pub async fn remember(&self, scope: &Scope, name: &str, value: serde_json::Value) -> Result<(), OrchError> {
        self.state.write(scope, &knowledge::key_for(name), value).await.map_err(|error| OrchError::Other(Box::new(error)))
    }

    /// Read a freeform knowledge entry back.
    pub async fn recall(&self, scope: &Scope, name: &str) -> Result<Option<serde_json::Value>, OrchError> {
        self.state.read(scope, &knowledge::key_for(name)).await.map_err(|error| OrchError::Other(Box::new(error)))
    }

    /// Run the seven-step request pipeline. Returns the response text the
    /// caller should surface. Only a failure to persist the resulting
    /// conversation surfaces as `Err` — every earlier soft failure
    /// (planning, execution, synthesis) is folded into the response text
    /// itself, matching the propagation policy (spec.md §7).
    pub async fn run(&self, user_input: &str, intent: Intent) -> Result<String, OrchError> {
        if intent == Intent::User {
            *self.last_user_activity.write().await = Utc::now();
            self.wait_for_improvement_slot().await;
        }

        let effective_input = self.apply_project_mention(user_input, intent).await;

        let scope = match self.active_project.read().await.clone() {
            Some(id) => Scope::Project(id),
            None => Scope::Global,
        };

        let memory_context = MemoryContextBuilder::new(self.state.clone()).build(&scope, &effective_input).await;

        let (response_text, tokens_used) = if mode::is_direct(&effective_input, self.config.direct_mode_max_chars) {
            self.run_direct(&effective_input, &memory_context).await
        } else {
            self.run_planned(&effective_input, &memory_context, &scope).await
        };

        self.last_run_tokens.store(tokens_used, Ordering::SeqCst);
        self.persist_conversation(&scope, &effective_input, &response_text, intent, tokens_used).await
    }

    async fn wait_for_improvement_slot(&self) {
        let deadline = Duration::from_secs(self.config.improvement_wait_seconds);
        let mut waited = Duration::ZERO;
        while self.gate.is_running() && waited < deadline {
            tokio::time::sleep(Duration::from_secs(1)).await;
            waited += Duration::from_secs(1);
        }
    }

    /// Scan for a `#<slug>` mention, switch the active project if the slug
    /// resolves, and return the input with the mention stripped. An
    /// unrecognized slug is left in place: the request proceeds against
    /// whatever project is already active rather than silently mutating
    /// the text on a typo.
    async fn apply_project_mention(&self, user_input: &str, intent: Intent) -> String {
        if intent != Intent::User {
            return user_input.to_string();
        }
        let Some((slug, stripped)) = mention::extract(user_input) else { return user_input.to_string() };

        match self.projects.get_by_slug(&slug).await {
            Ok(Some(mut project)) => {
                self.sandbox.set_root(project.workspace_path.clone());
                project.last_used_at = Some(Utc::now());
                if let Err(error) = self.projects.save(&project).await {
                    tracing::warn!(%error, "failed to persist project last_used_at");
                }
                self.bus.publish(forge_types::BusEvent::project_changed(project.id.as_str(), &project.slug)).await;
                *self.active_project.write().await = Some(project.id.clone());
                stripped
            }
            Ok(None) => {
                tracing::debug!(slug, "project mention did not resolve to a known project");
                user_input.to_string()
            }
            Err(error) => {
                tracing::warn!(%error, slug, "project lookup failed, ignoring mention");
                user_input.to_string()
            }
        }
    }

    async fn run_direct(&self, input: &str, memory_context: &str) -> (String, u64) {
        let ctx = AgentContext { task_id: TaskId::new(new_id()), task_description: input.to_string(), memory_context: memory_context.to_string() };
        let result = self.runner.run("coder", ctx).await;
        let text = if result.success { result.output } else { format!("I ran into a problem: {}", result.error.unwrap_or_default()) };
        (text, result.tokens_used)
    }

    async fn run_planned(&self, input: &str, memory_context: &str, scope: &Scope) -> (String, u64) {
        let mut plan = create_plan(self.provider.as_ref(), input, Some(memory_context)).await;

        let executor = Executor::new(self.runner.clone(), self.bus.clone())
            .with_max_parallelism(self.config.executor_max_parallelism)
            .with_state(self.state.clone());

        if let Err(error) = executor.execute(&mut plan, Some(memory_context), scope).await {
            tracing::warn!(%error, "plan was rejected before any task ran");
        }

        let mut tokens_used = executor.total_tokens();

        if plan.tasks.len() == 1 {
            let task = &plan.tasks[0];
            let text = match task.status {
                TaskStatus::Done => task.result.clone().unwrap_or_default(),
                _ => format!("I ran into a problem: {}", task.error.as_deref().unwrap_or("the task did not complete")),
            };
            return (text, tokens_used);
        }

        let digest = synthesis_digest(&plan);
        let ctx = AgentContext {
            task_id: TaskId::new(new_id()),
            task_description: format!("Original request: {}\n\n{digest}", plan.original_request),
            memory_context: memory_context.to_string(),
        };
        let synthesis = self.runner.run("orchestrator", ctx).await;
        tokens_used += synthesis.tokens_used;

        let text = if synthesis.success { synthesis.output } else { digest };
        (text, tokens_used)
    }

    async fn persist_conversation(&self, scope: &Scope, user_msg: &str, agent_msg: &str, intent: Intent, tokens_used: u64) -> Result<String, OrchError> {
        let conversation = Conversation::new(
            ConversationId::new(new_id()),
            Utc::now(),
            user_msg,
            agent_msg,
            serde_json::json!({"intent": intent.label(), "tokens_used": tokens_used}),
        );
        let key = conversation_log::key_for(&conversation);
        let value = serde_json::to_value(&conversation).map_err(|error| OrchError::Other(Box::new(error)))?;
        self.state.write(scope, &key, value).await.map_err(|error| OrchError::PersistenceFailed(error.to_string()))?;

        match self.provider.embed(agent_msg).await {
            Ok(vector) => {
                let embedding_key = format!("{key}:embedding");
                if let Err(error) = self.state.write(scope, &embedding_key, serde_json::json!(vector)).await {
                    tracing::warn!(%error, "failed to persist embedding, continuing without it");
                }
            }
            Err(EmbedError::Unavailable(reason)) => {
                tracing::debug!(reason, "embeddings unavailable, skipping semantic storage for this turn");
            }
        }

        Ok(agent_msg.to_string())
    }
}

fn synthesis_digest(plan: &Plan) -> String {
    plan.tasks
        .iter()
        .map(|task| match task.status {
            TaskStatus::Done => format!("### {} — OK\n{}", task.name, task.result.as_deref().unwrap_or("")),
            _ => format!("### {} — FAILED\n{}", task.name, task.error.as_deref().unwrap_or("unknown error")),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_provider::testing::ScriptedProvider;
    use forge_state::memory::MemoryStore;
    use forge_state::project::KvProjectStore;
    use std::env::temp_dir;

    fn orchestrator(provider: ScriptedProvider) -> Orchestrator<ScriptedProvider> {
        let state: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let projects: Arc<dyn ProjectStore> = Arc::new(KvProjectStore::new(state.clone()));
        Orchestrator::new(
            Arc::new(provider),
            Arc::new(ToolRegistry::new()),
            Arc::new(Sandbox::new(temp_dir())),
            Arc::new(Bus::new()),
            state,
            projects,
            Arc::new(ImprovementGate::new()),
            RuntimeConfig::default(),
        )
    }

    #[tokio::test]
    async fn short_request_runs_in_direct_mode_and_persists_a_conversation() {
        let orch = orchestrator(ScriptedProvider::single_text("done"));
        let response = orch.run("fix the typo", Intent::User).await.unwrap();
        assert_eq!(response, "done");

        let keys = orch.state.list(&Scope::Global, conversation_log::list_prefix()).await.unwrap();
        assert_eq!(keys.len(), 1);
    }

    #[tokio::test]
    async fn unknown_project_mention_falls_back_to_global_scope() {
        let orch = orchestrator(ScriptedProvider::single_text("done"));
        let response = orch.run("work on #nonexistent please", Intent::User).await.unwrap();
        assert_eq!(response, "done");
        assert!(orch.active_project.read().await.is_none());
    }

    #[tokio::test]
    async fn known_project_mention_switches_active_project_and_sandbox_root() {
        let orch = orchestrator(ScriptedProvider::single_text("done"));
        let workspace = temp_dir().join("forge-orch-test-project");
        let project = forge_types::Project::new("p1", "Demo", "demo", workspace.clone(), Utc::now());
        orch.projects.save(&project).await.unwrap();

        orch.run("work on #demo please", Intent::User).await.unwrap();

        assert_eq!(orch.active_project.read().await.as_ref().unwrap().as_str(), "p1");
        assert_eq!(orch.sandbox.root(), workspace);
    }

    #[tokio::test]
    async fn improvement_intent_skips_the_gate_wait() {
        let orch = orchestrator(ScriptedProvider::single_text("done"));
        orch.gate.acquire();
        let response = orch.run("do improvement work", Intent::Improvement).await.unwrap();
        assert_eq!(response, "done");
    }
}
