#![deny(missing_docs)]
//! The plan executor (spec.md §4.5): drives a [`Plan`] to completion by
//! repeatedly computing the ready set (pending tasks whose dependencies
//! have all completed), running it, and folding results back in, until
//! every task reaches a terminal state or a deadlock is detected.
//!
//! Concurrency is achieved without `tokio::spawn`: one batch's ready tasks
//! are run through `futures_util::stream::buffer_unordered`, bounded by
//! `max_parallelism`, inside a single `.await`. A batch of size one takes
//! the same path as a larger batch — there is nothing to gain from a
//! separate sequential branch when `buffer_unordered(n)` with one item
//! already behaves like a plain `.await`.

use forge_agent::{AgentContext, AgentRunner};
use forge_bus::Bus;
use forge_types::{AgentResult, BusEvent, Plan, TaskSpec, TaskStatus};
use futures_util::stream::{self, StreamExt};
use layer0::error::ExecutorError;
use layer0::id::TaskId;
use layer0::scope::Scope;
use layer0::state::StateStore;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const DEFAULT_MAX_PARALLELISM: usize = 5;
const RESULT_TRUNCATE_CHARS: usize = 3000;

fn task_key(task_id: &str) -> String {
    format!("task:{task_id}")
}

/// Build the dependency-context section handed to a task's agent: the
/// original request, plus one `### <name> — OK|FAILED` section per
/// predecessor (per spec.md §4.5).
fn dependency_context(plan: &Plan, task: &TaskSpec) -> String {
    let mut sections = vec![format!("Original user request: {}", plan.original_request)];
    for dep_id in &task.depends_on {
        let Some(dep) = plan.task(dep_id.as_str()) else { continue };
        match dep.status {
            TaskStatus::Done => {
                let result: String = dep.result.as_deref().unwrap_or("").chars().take(RESULT_TRUNCATE_CHARS).collect();
                sections.push(format!("### {} — OK\n{result}", dep.name));
            }
            TaskStatus::Failed => {
                let error = dep.error.as_deref().unwrap_or("unknown error");
                sections.push(format!("### {} — FAILED\nError: {error}", dep.name));
            }
            TaskStatus::Pending | TaskStatus::Running => {}
        }
    }
    sections.join("\n\n")
}

fn merge_context(memory_context: Option<&str>, dependency_context: &str) -> String {
    match memory_context {
        Some(mc) if !mc.is_empty() => format!("{mc}\n\n{dependency_context}"),
        _ => dependency_context.to_string(),
    }
}

fn ready_ids(plan: &Plan, completed: &HashSet<String>) -> Vec<String> {
    plan.tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending && t.depends_on.iter().all(|d| completed.contains(d.as_str())))
        .map(|t| t.id.as_str().to_string())
        .collect()
}

/// Drives one [`Plan`] to completion against a shared [`AgentRunner`],
/// publishing lifecycle events on a [`Bus`] and optionally persisting each
/// task's outcome to a [`StateStore`].
pub struct Executor {
    runner: Arc<dyn AgentRunner>,
    bus: Arc<Bus>,
    state: Option<Arc<dyn StateStore>>,
    max_parallelism: usize,
    total_tokens: AtomicU64,
}

impl Executor {
    /// Build an executor with the default parallelism cap and no
    /// persistence backend.
    pub fn new(runner: Arc<dyn AgentRunner>, bus: Arc<Bus>) -> Self {
        Self { runner, bus, state: None, max_parallelism: DEFAULT_MAX_PARALLELISM, total_tokens: AtomicU64::new(0) }
    }

    /// Cap how many ready tasks run concurrently within one batch.
    pub fn with_max_parallelism(mut self, max_parallelism: usize) -> Self {
        self.max_parallelism = max_parallelism.max(1);
        self
    }

    /// Persist each task's outcome to `state` under `task:<id>` after it
    /// completes. Failures to persist are logged and never fail the task.
    pub fn with_state(mut self, state: Arc<dyn StateStore>) -> Self {
        self.state = Some(state);
        self
    }

    /// Tokens consumed across every task run through this executor
    /// instance since construction. The orchestrator builds a fresh
    /// `Executor` per `run()` call, so this is exactly the run's total —
    /// the aggregate step the token-accounting open question calls for.
    pub fn total_tokens(&self) -> u64 {
        self.total_tokens.load(Ordering::SeqCst)
    }

    /// Run `plan` to completion, mutating its tasks in place.
    ///
    /// Returns [`ExecutorError::MalformedPlan`] only for structural defects
    /// that make scheduling impossible before a single task has run (a
    /// duplicate task id). A dangling `depends_on` reference is not
    /// treated as malformed: the referenced task simply never completes,
    /// so the dependent task surfaces through the ordinary deadlock path.
    pub async fn execute(&self, plan: &mut Plan, memory_context: Option<&str>, scope: &Scope) -> Result<(), ExecutorError> {
        validate(plan)?;

        self.bus.publish(BusEvent::plan_started(plan.id.as_str(), &plan.original_request)).await;

        let mut completed: HashSet<String> = HashSet::new();
        while !plan.is_terminal() {
            let ready = ready_ids(plan, &completed);
            if ready.is_empty() {
                self.mark_deadlocked(plan, &completed).await;
                break;
            }
            self.run_batch(plan, &ready, memory_context, scope).await;
            for id in &ready {
                if plan.task(id).map(|t| t.status) == Some(TaskStatus::Done) {
                    completed.insert(id.clone());
                }
            }
        }

        self.bus.publish(BusEvent::plan_completed(plan.id.as_str(), plan.has_failures())).await;
        Ok(())
    }

    async fn mark_deadlocked(&self, plan: &mut Plan, completed: &HashSet<String>) {
        let pending_ids: Vec<String> = plan.tasks.iter().filter(|t| t.status == TaskStatus::Pending).map(|t| t.id.as_str().to_string()).collect();
        for id in pending_ids {
            let unmet: Vec<String> = plan
                .task(&id)
                .map(|t| t.depends_on.iter().filter(|d| !completed.contains(d.as_str())).map(|d| d.to_string()).collect())
                .unwrap_or_default();
            let error = format!("deadlock: unsatisfied deps {unmet:?}");
            if let Some(task) = plan.task_mut(&id) {
                task.status = TaskStatus::Failed;
                task.error = Some(error.clone());
            }
            self.bus.publish(BusEvent::task_failed(plan.id.as_str(), &id, &error)).await;
        }
    }

    async fn run_batch(&self, plan: &mut Plan, ready: &[String], memory_context: Option<&str>, scope: &Scope) {
        for id in ready {
            if let Some(task) = plan.task_mut(id) {
                task.status = TaskStatus::Running;
            }
            self.bus
                .publish(BusEvent::task_started(plan.id.as_str(), id, plan.task(id).map(|t| t.agent.as_str()).unwrap_or("")))
                .await;
        }

        let jobs: Vec<(TaskId, String, AgentContext)> = ready
            .iter()
            .filter_map(|id| {
                let task = plan.task(id)?;
                let dep_ctx = dependency_context(plan, task);
                let ctx = AgentContext {
                    task_id: task.id.clone(),
                    task_description: task.description.clone(),
                    memory_context: merge_context(memory_context, &dep_ctx),
                };
                Some((task.id.clone(), task.agent.clone(), ctx))
            })
            .collect();

        let runner = &self.runner;
        let results: Vec<AgentResult> = stream::iter(jobs.into_iter().map(|(_, role, ctx)| async move { runner.run(&role, ctx).await }))
            .buffer_unordered(self.max_parallelism)
            .collect()
            .await;

        for result in results {
            self.total_tokens.fetch_add(result.tokens_used, Ordering::SeqCst);
            let id = result.task_id.as_str().to_string();
            if let Some(task) = plan.task_mut(&id) {
                if result.success {
                    task.status = TaskStatus::Done;
                    task.result = Some(result.output.clone());
                } else {
                    task.status = TaskStatus::Failed;
                    task.error = result.error.clone();
                }
            }
            if result.success {
                self.bus.publish(BusEvent::task_completed(plan.id.as_str(), &id)).await;
            } else {
                self.bus.publish(BusEvent::task_failed(plan.id.as_str(), &id, result.error.as_deref().unwrap_or(""))).await;
            }
            self.persist(scope, &id, plan).await;
        }
    }

    async fn persist(&self, scope: &Scope, task_id: &str, plan: &Plan) {
        let Some(state) = &self.state else { return };
        let Some(task) = plan.task(task_id) else { return };
        let Ok(value) = serde_json::to_value(task) else { return };
        if let Err(error) = state.write(scope, &task_key(task_id), value).await {
            tracing::warn!(task_id, %error, "failed to persist task; continuing");
        }
    }
}

fn validate(plan: &Plan) -> Result<(), ExecutorError> {
    let mut seen = HashSet::new();
    for task in &plan.tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(ExecutorError::MalformedPlan(format!("duplicate task id {}", task.id.as_str())));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use layer0::id::{PlanId, SessionId};
    use std::sync::Mutex as StdMutex;

    struct EchoingRunner;

    #[async_trait]
    impl AgentRunner for EchoingRunner {
        async fn run(&self, role: &str, ctx: AgentContext) -> AgentResult {
            AgentResult::ok(ctx.task_id, role, format!("ran {role}: {}", ctx.task_description), 0, 0)
        }
    }

    struct FailingRunner;

    #[async_trait]
    impl AgentRunner for FailingRunner {
        async fn run(&self, role: &str, ctx: AgentContext) -> AgentResult {
            AgentResult::err(ctx.task_id, role, "boom", 0, 0)
        }
    }

    fn spec(id: &str, name: &str, deps: &[&str]) -> TaskSpec {
        TaskSpec::new(id, name, format!("do {name}"), "coder", deps.iter().map(|d| (*d).into()).collect())
    }

    fn scope() -> Scope {
        Scope::Session(SessionId::new("s1"))
    }

    #[tokio::test]
    async fn runs_independent_tasks_to_completion() {
        let executor = Executor::new(Arc::new(EchoingRunner), Arc::new(Bus::new()));
        let mut plan = Plan::new(PlanId::new("p1"), "s", vec![spec("a", "A", &[]), spec("b", "B", &[])], "req");

        executor.execute(&mut plan, None, &scope()).await.unwrap();

        assert!(plan.is_terminal());
        assert!(!plan.has_failures());
        assert_eq!(plan.task("a").unwrap().status, TaskStatus::Done);
        assert_eq!(plan.task("b").unwrap().status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn runs_chained_dependency_after_predecessor() {
        let executor = Executor::new(Arc::new(EchoingRunner), Arc::new(Bus::new()));
        let mut plan = Plan::new(PlanId::new("p1"), "s", vec![spec("a", "A", &[]), spec("b", "B", &["a"])], "req");

        executor.execute(&mut plan, None, &scope()).await.unwrap();

        assert!(plan.is_terminal());
        assert!(!plan.has_failures());
    }

    #[tokio::test]
    async fn dangling_dependency_deadlocks_instead_of_rejecting_the_plan() {
        let executor = Executor::new(Arc::new(EchoingRunner), Arc::new(Bus::new()));
        let mut plan = Plan::new(PlanId::new("p1"), "s", vec![spec("a", "A", &["ghost"])], "req");

        executor.execute(&mut plan, None, &scope()).await.unwrap();

        let task = plan.task("a").unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.error.as_ref().unwrap().contains("deadlock"));
        assert!(task.error.as_ref().unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn failed_predecessor_deadlocks_dependent_task() {
        let executor = Executor::new(Arc::new(FailingRunner), Arc::new(Bus::new()));
        let mut plan = Plan::new(PlanId::new("p1"), "s", vec![spec("a", "A", &[]), spec("b", "B", &["a"])], "req");

        executor.execute(&mut plan, None, &scope()).await.unwrap();

        assert_eq!(plan.task("a").unwrap().status, TaskStatus::Failed);
        let b = plan.task("b").unwrap();
        assert_eq!(b.status, TaskStatus::Failed);
        assert!(b.error.as_ref().unwrap().contains("deadlock"));
    }

    #[tokio::test]
    async fn duplicate_task_id_is_rejected_before_running_anything() {
        let executor = Executor::new(Arc::new(EchoingRunner), Arc::new(Bus::new()));
        let mut plan = Plan::new(PlanId::new("p1"), "s", vec![spec("a", "A", &[]), spec("a", "A2", &[])], "req");

        let result = executor.execute(&mut plan, None, &scope()).await;
        assert!(matches!(result, Err(ExecutorError::MalformedPlan(_))));
    }

    #[tokio::test]
    async fn dependency_context_carries_predecessor_result_and_original_request() {
        let probe = Arc::new(ProbeRunner { captured: StdMutex::new(Vec::new()) });
        let executor = Executor::new(probe.clone(), Arc::new(Bus::new()));
        let mut plan = Plan::new(PlanId::new("p1"), "s", vec![spec("a", "A", &[]), spec("b", "B", &["a"])], "build the thing");

        executor.execute(&mut plan, Some("remembered fact"), &scope()).await.unwrap();

        let captured = probe.captured.lock().unwrap();
        let (_, b_ctx) = captured.iter().find(|(desc, _)| desc == "do B").expect("task b context captured");
        assert!(b_ctx.contains("remembered fact"));
        assert!(b_ctx.contains("Original user request: build the thing"));
        assert!(b_ctx.contains("### A — OK"));
    }

    struct ProbeRunner {
        captured: StdMutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl AgentRunner for ProbeRunner {
        async fn run(&self, role: &str, ctx: AgentContext) -> AgentResult {
            self.captured.lock().unwrap().push((ctx.task_description.clone(), ctx.memory_context.clone()));
            AgentResult::ok(ctx.task_id, role, "ok", 0, 0)
        }
    }
}
