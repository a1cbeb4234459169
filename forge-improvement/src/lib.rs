#![deny(missing_docs)]
//! The self-improvement loop (spec.md §4.9): a single long-lived,
//! idle-sensitive task that, when its gate permits, drives the
//! orchestrator against its own codebase on a short-lived VCS branch and
//! merges whatever it changed.
//!
//! Built the same way [`forge_autonomous::AutonomousLoop`] is: a struct
//! holding an `Arc<Orchestrator<P>>` plus its own collaborators, with a
//! `run(shutdown: CancellationToken)` entrypoint.

pub mod vcs;

pub use vcs::VcsOps;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use forge_errors::ErrorCollector;
use forge_orchestrator::{Intent, Orchestrator};
use forge_provider::Provider;
use forge_state::ImprovementStore;
use forge_types::ImprovementAttempt;
use layer0::id::ImprovementAttemptId;
use layer0::scope::Scope;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio_util::sync::CancellationToken;

const WARMUP: StdDuration = StdDuration::from_secs(30);
const EVALUATE_EVERY: StdDuration = StdDuration::from_secs(60);
const IMPROVEMENT_BRANCH_PREFIX: &str = "improve/";
const LOOP_STATE_KEY: &str = "improvement.loop_state";
const RECENT_ATTEMPTS_WINDOW: usize = 200;

/// Tunables the improvement loop is built with (spec.md §4.9, defaults
/// matching `forge_orchestrator::RuntimeConfig`'s).
#[derive(Debug, Clone)]
pub struct ImprovementConfig {
    /// Feature flag; when `false` the loop never runs a cycle.
    pub enabled: bool,
    /// Minimum minutes between cycles.
    pub interval_minutes: i64,
    /// Maximum cycles started within any rolling hour.
    pub max_cycles_per_hour: u32,
    /// Token budget consumed by cycles within any rolling hour.
    pub token_budget_per_hour: u64,
    /// Minutes of user inactivity required before a cycle may run, unless
    /// the error-mode bypass applies.
    pub idle_minutes_before_run: i64,
    /// Consecutive no-improvement cycles before rotation mode kicks in.
    pub rotation_threshold: u32,
    /// Deadline applied to the cycle's orchestrator run.
    pub invocation_timeout: StdDuration,
    /// The branch to return to between and after cycles.
    pub mainline_branch: String,
}

impl Default for ImprovementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: 360,
            max_cycles_per_hour: 1,
            token_budget_per_hour: 80_000,
            idle_minutes_before_run: 5,
            rotation_threshold: 20,
            invocation_timeout: StdDuration::from_secs(300),
            mainline_branch: "main".to_string(),
        }
    }
}

/// Counters persisted across restarts (spec.md §4.9 step 6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoopState {
    cycle: u64,
    consecutive_no_improvement: u32,
    last_run_at: Option<DateTime<Utc>>,
    last_cycle_tokens: u64,
}

/// Which prompt mode a cycle runs in (spec.md §4.9 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleMode {
    Fix,
    Rotation,
    Generic,
}

fn select_mode(has_actionable: bool, consecutive_no_improvement: u32, rotation_threshold: u32) -> CycleMode {
    if has_actionable {
        CycleMode::Fix
    } else if consecutive_no_improvement >= rotation_threshold {
        CycleMode::Rotation
    } else {
        CycleMode::Generic
    }
}

fn build_prompt(mode: CycleMode, error_block: &str) -> String {
    match mode {
        CycleMode::Fix => format!(
            "The following unresolved errors were reported by the runtime:\n\n{error_block}\n\nDiagnose the root cause and patch it. Make the smallest safe change that resolves it."
        ),
        CycleMode::Rotation => {
            "No improvement has landed in a while. Radically change strategy: pick a different area of the codebase than recent cycles and make small, safe changes.".to_string()
        }
        CycleMode::Generic => "Identify one concrete, small improvement to this codebase, implement it, and verify it.".to_string(),
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The improvement loop.
pub struct ImprovementLoop<P: Provider + 'static> {
    orchestrator: Arc<Orchestrator<P>>,
    errors: Arc<ErrorCollector>,
    improvements: Arc<dyn ImprovementStore>,
    vcs: Arc<dyn VcsOps>,
    config: ImprovementConfig,
}

impl<P: Provider + 'static> ImprovementLoop<P> {
    /// Build a loop over the given orchestrator and collaborators.
    pub fn new(orchestrator: Arc<Orchestrator<P>>, errors: Arc<ErrorCollector>, improvements: Arc<dyn ImprovementStore>, vcs: Arc<dyn VcsOps>, config: ImprovementConfig) -> Self {
        Self { orchestrator, errors, improvements, vcs, config }
    }

    /// Evaluate the gate every 60s (after a 30s warm-up) until `shutdown`
    /// is triggered, running a cycle whenever every gate condition holds.
    pub async fn run(&self, shutdown: CancellationToken) {
        tokio::select! {
            _ = tokio::time::sleep(WARMUP) => {}
            _ = shutdown.cancelled() => return,
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(EVALUATE_EVERY) => {}
                _ = shutdown.cancelled() => return,
            }

            if let Err(error) = self.maybe_run_cycle().await {
                tracing::warn!(%error, "improvement loop tick failed");
            }
        }
    }

    async fn maybe_run_cycle(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if !self.config.enabled {
            return Ok(());
        }

        let current_branch = self.vcs.current_branch().await?;
        if current_branch.starts_with(IMPROVEMENT_BRANCH_PREFIX) {
            tracing::warn!(branch = %current_branch, "found an improvement branch checked out at gate time, returning to mainline");
            self.vcs.checkout(&self.config.mainline_branch).await?;
            return Ok(());
        }

        let state = self.load_state().await;
        let now = Utc::now();

        if let Some(last_run_at) = state.last_run_at {
            if now - last_run_at < ChronoDuration::minutes(self.config.interval_minutes) {
                return Ok(());
            }
        }

        let recent = self.improvements.recent(RECENT_ATTEMPTS_WINDOW).await.map_err(|e| Box::new(e) as Box<dyn Error + Send + Sync>)?;
        let hour_ago = now - ChronoDuration::hours(1);
        let cycles_this_hour = recent.iter().filter(|a| a.created_at >= hour_ago).count() as u32;
        if cycles_this_hour >= self.config.max_cycles_per_hour {
            return Ok(());
        }
        let tokens_this_hour: u64 = recent.iter().filter(|a| a.created_at >= hour_ago).map(|a| a.tokens_used).sum();
        if tokens_this_hour >= self.config.token_budget_per_hour {
            return Ok(());
        }

        let has_actionable = self.errors.has_actionable();
        if !has_actionable {
            let idle_minutes = (now - self.orchestrator.last_user_activity().await).num_minutes();
            if idle_minutes < self.config.idle_minutes_before_run {
                return Ok(());
            }
        }

        self.run_cycle(state, has_actionable).await
    }

    async fn run_cycle(&self, mut state: LoopState, has_actionable: bool) -> Result<(), Box<dyn Error + Send + Sync>> {
        let gate = self.orchestrator.gate();
        if !gate.acquire() {
            return Ok(());
        }
        let result = self.run_cycle_inner(&mut state, has_actionable).await;
        gate.release();
        result
    }

    async fn run_cycle_inner(&self, state: &mut LoopState, has_actionable: bool) -> Result<(), Box<dyn Error + Send + Sync>> {
        let branch = format!("{IMPROVEMENT_BRANCH_PREFIX}{}", Utc::now().format("%Y%m%dT%H%M%SZ"));
        self.vcs.create_branch(&branch).await?;

        let mode = select_mode(has_actionable, state.consecutive_no_improvement, self.config.rotation_threshold);
        let prompt = build_prompt(mode, &self.errors.format_for_prompt());

        let run = self.orchestrator.run(&prompt, Intent::Improvement);
        let (tokens_used, error) = match tokio::time::timeout(self.config.invocation_timeout, run).await {
            Ok(Ok(_)) => (self.orchestrator.last_run_tokens(), None),
            Ok(Err(error)) => (self.orchestrator.last_run_tokens(), Some(error.to_string())),
            Err(_) => (0, Some("improvement cycle timed out".to_string())),
        };

        let changed_paths = self.vcs.changed_paths_vs(&self.config.mainline_branch).await.unwrap_or_default();
        let merged = !changed_paths.is_empty();

        if merged {
            if let Err(error) = self.vcs.commit_all(&format!("improvement cycle {}", state.cycle)).await {
                tracing::warn!(%error, "failed to commit improvement-cycle changes");
            }
            if let Err(error) = self.vcs.checkout(&self.config.mainline_branch).await {
                tracing::warn!(%error, "failed to check out mainline before merge");
            }
            if let Err(error) = self.vcs.merge(&branch).await {
                tracing::warn!(%error, branch = %branch, "failed to merge improvement branch");
            }
            state.consecutive_no_improvement = 0;
            if mode == CycleMode::Fix {
                self.errors.mark_all_resolved();
            }
        } else {
            state.consecutive_no_improvement += 1;
        }

        if let Err(error) = self.vcs.checkout(&self.config.mainline_branch).await {
            tracing::warn!(%error, "failed to check out mainline after cycle");
        }
        if let Err(error) = self.vcs.delete_branch(&branch).await {
            tracing::warn!(%error, branch = %branch, "failed to delete improvement branch, leaving it for manual cleanup");
        }

        state.cycle += 1;
        state.last_run_at = Some(Utc::now());
        state.last_cycle_tokens = tokens_used;

        let attempt = ImprovementAttempt {
            id: ImprovementAttemptId::new(new_id()),
            cycle: state.cycle,
            branch,
            changed_paths,
            merged,
            tokens_used,
            error,
            created_at: Utc::now(),
        };
        self.improvements.append(&attempt).await.map_err(|e| Box::new(e) as Box<dyn Error + Send + Sync>)?;
        self.save_state(state).await
    }

    async fn load_state(&self) -> LoopState {
        match self.orchestrator.recall(&Scope::Global, LOOP_STATE_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_default(),
            Ok(None) => LoopState::default(),
            Err(error) => {
                tracing::warn!(%error, "failed to recall improvement loop state, starting from zero");
                LoopState::default()
            }
        }
    }

    async fn save_state(&self, state: &LoopState) -> Result<(), Box<dyn Error + Send + Sync>> {
        let value = serde_json::to_value(state)?;
        self.orchestrator.remember(&Scope::Global, LOOP_STATE_KEY, value).await.map_err(|e| Box::new(e) as Box<dyn Error + Send + Sync>)
    }
}

#[cfg(test)]
mod tests {
    use super::vcs::fake::FakeVcs;
    use super::*;
    use forge_bus::Bus;
    use forge_orchestrator::{ImprovementGate, RuntimeConfig};
    use forge_provider::testing::ScriptedProvider;
    use forge_sandbox::Sandbox;
    use forge_state::memory::MemoryStore;
    use forge_state::project::KvProjectStore;
    use forge_state::{KvImprovementStore, ProjectStore};
    use layer0::state::StateStore;
    use std::env::temp_dir;

    fn build(provider: ScriptedProvider) -> (Arc<Orchestrator<ScriptedProvider>>, Arc<ErrorCollector>, Arc<dyn ImprovementStore>, Arc<FakeVcs>) {
        let state: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let projects: Arc<dyn ProjectStore> = Arc::new(KvProjectStore::new(state.clone()));
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(provider),
            Arc::new(forge_tool::ToolRegistry::new()),
            Arc::new(Sandbox::new(temp_dir())),
            Arc::new(Bus::new()),
            state.clone(),
            projects,
            Arc::new(ImprovementGate::new()),
            RuntimeConfig::default(),
        ));
        let errors = Arc::new(ErrorCollector::new());
        let improvements: Arc<dyn ImprovementStore> = Arc::new(KvImprovementStore::new(state));
        let vcs = Arc::new(FakeVcs::new("main"));
        (orchestrator, errors, improvements, vcs)
    }

    #[tokio::test]
    async fn disabled_loop_never_runs_a_cycle() {
        let (orchestrator, errors, improvements, vcs) = build(ScriptedProvider::single_text("done"));
        let mut config = ImprovementConfig::default();
        config.enabled = false;
        let loop_ = ImprovementLoop::new(orchestrator, errors, improvements.clone(), vcs, config);
        loop_.maybe_run_cycle().await.unwrap();
        assert!(improvements.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn improvement_branch_already_checked_out_is_abandoned_without_a_cycle() {
        let (orchestrator, errors, improvements, vcs) = build(ScriptedProvider::single_text("done"));
        *vcs.branch.lock().unwrap() = "improve/stale".to_string();
        let mut config = ImprovementConfig::default();
        config.idle_minutes_before_run = 0;
        let loop_ = ImprovementLoop::new(orchestrator, errors, improvements.clone(), vcs.clone(), config);
        loop_.maybe_run_cycle().await.unwrap();
        assert_eq!(*vcs.branch.lock().unwrap(), "main");
        assert!(improvements.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn idle_gate_blocks_a_cycle_with_no_actionable_errors() {
        let (orchestrator, errors, improvements, vcs) = build(ScriptedProvider::single_text("done"));
        let mut config = ImprovementConfig::default();
        config.idle_minutes_before_run = 999_999;
        let loop_ = ImprovementLoop::new(orchestrator, errors, improvements.clone(), vcs, config);
        loop_.maybe_run_cycle().await.unwrap();
        assert!(improvements.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_mode_bypasses_the_idle_gate_and_runs_fix_mode() {
        let (orchestrator, errors, improvements, vcs) = build(ScriptedProvider::single_text("fixed it"));
        errors.record("forge_tool::registry", "disk full", None);
        let vcs_for_cycle = vcs.clone().with_changed_paths(vec!["src/lib.rs".to_string()]);
        let vcs_for_cycle = Arc::new(vcs_for_cycle);
        let mut config = ImprovementConfig::default();
        config.idle_minutes_before_run = 999_999;
        let loop_ = ImprovementLoop::new(orchestrator, errors.clone(), improvements.clone(), vcs_for_cycle, config);
        loop_.maybe_run_cycle().await.unwrap();

        let attempts = improvements.recent(10).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].merged);
        assert!(!errors.has_actionable());
    }

    #[tokio::test]
    async fn no_changes_increments_consecutive_no_improvement_and_persists_state() {
        let (orchestrator, errors, improvements, vcs) = build(ScriptedProvider::single_text("looked around, no change needed"));
        let mut config = ImprovementConfig::default();
        config.idle_minutes_before_run = 0;
        let loop_ = ImprovementLoop::new(orchestrator.clone(), errors, improvements.clone(), vcs, config);
        loop_.maybe_run_cycle().await.unwrap();

        let attempts = improvements.recent(10).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert!(!attempts[0].merged);

        let state = loop_.load_state().await;
        assert_eq!(state.cycle, 1);
        assert_eq!(state.consecutive_no_improvement, 1);
    }

    #[tokio::test]
    async fn branch_is_always_returned_to_mainline_and_deleted() {
        let (orchestrator, errors, improvements, vcs) = build(ScriptedProvider::single_text("no change"));
        let mut config = ImprovementConfig::default();
        config.idle_minutes_before_run = 0;
        let loop_ = ImprovementLoop::new(orchestrator, errors, improvements, vcs.clone(), config);
        loop_.maybe_run_cycle().await.unwrap();

        assert_eq!(*vcs.branch.lock().unwrap(), "main");
        assert_eq!(vcs.deleted_branches.lock().unwrap().len(), 1);
    }
}
