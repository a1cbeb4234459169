#![deny(missing_docs)]
//! The autonomous loop (spec.md §4.8): a single long-lived task that, after
//! a 60-second warm-up, sleeps until the next aligned tick and then (a)
//! fires every due scheduled item and (b) processes one project's
//! objective, round-robin, under a population-sized dynamic frequency.
//!
//! Built the way [`forge_improvement::ImprovementLoop`] is: a struct
//! holding an `Arc<Orchestrator<P>>` plus its own store handles, with a
//! `run(shutdown: CancellationToken)` entrypoint the binary spawns as one
//! `tokio::spawn`ed task (spec.md §5's "long-lived task" list).

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use forge_orchestrator::{Intent, Orchestrator};
use forge_provider::Provider;
use forge_scheduler::{compute_next_run, next_aligned_tick};
use forge_state::{ProjectStore, ScheduleStore};
use forge_types::{Project, ScheduledItem, ScheduledItemStatus, ScheduledItemType};
use layer0::error::StateError;
use layer0::scope::Scope;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

const WARMUP: StdDuration = StdDuration::from_secs(60);
const SUMMARY_CHARS: usize = 200;
const RECENT_CONVERSATIONS: usize = 3;
const CONVERSATION_SCAN_LIMIT: usize = 50;

/// Tunables the autonomous loop is built with (spec.md §4.8, defaults
/// matching `forge_orchestrator::RuntimeConfig`'s).
#[derive(Debug, Clone)]
pub struct AutonomousConfig {
    /// Tick alignment, in minutes.
    pub tick_minutes: u32,
    /// Per-project daily cap on objective-processing runs.
    pub daily_cap_per_project: u32,
    /// Deadline applied to each scheduled-item or objective invocation.
    pub invocation_timeout: StdDuration,
}

impl Default for AutonomousConfig {
    fn default() -> Self {
        Self { tick_minutes: 5, daily_cap_per_project: 4, invocation_timeout: StdDuration::from_secs(300) }
    }
}

/// The project-objective processing interval, in minutes, for a given
/// count of objective-bearing projects (spec.md §4.8 step 5's table).
/// `None` means "skip objective processing this tick" (zero projects).
fn objective_interval_minutes(project_count: usize) -> Option<i64> {
    match project_count {
        0 => None,
        1..=6 => Some(60),
        7..=14 => Some(30),
        15..=25 => Some(15),
        26..=40 => Some(10),
        _ => Some(5),
    }
}

/// The autonomous loop.
pub struct AutonomousLoop<P: Provider + 'static> {
    orchestrator: Arc<Orchestrator<P>>,
    schedule: Arc<dyn ScheduleStore>,
    projects: Arc<dyn ProjectStore>,
    config: AutonomousConfig,
    last_tick: RwLock<Option<DateTime<Utc>>>,
}

impl<P: Provider + 'static> AutonomousLoop<P> {
    /// Build a loop over the given orchestrator and stores.
    pub fn new(orchestrator: Arc<Orchestrator<P>>, schedule: Arc<dyn ScheduleStore>, projects: Arc<dyn ProjectStore>, config: AutonomousConfig) -> Self {
        Self { orchestrator, schedule, projects, config, last_tick: RwLock::new(None) }
    }

    /// The timestamp of the most recently completed tick, if any.
    pub async fn last_tick(&self) -> Option<DateTime<Utc>> {
        *self.last_tick.read().await
    }

    /// Run ticks until `shutdown` is triggered. A pending `orchestrator.run`
    /// within an in-progress tick is allowed to finish or hit its own
    /// timeout; the loop itself returns promptly once cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        tokio::select! {
            _ = tokio::time::sleep(WARMUP) => {}
            _ = shutdown.cancelled() => return,
        }

        loop {
            let now = Utc::now();
            let next = next_aligned_tick(self.config.tick_minutes, now);
            let sleep_for = (next - now).to_std().unwrap_or(StdDuration::ZERO);

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = shutdown.cancelled() => return,
            }

            *self.last_tick.write().await = Some(Utc::now());

            if self.orchestrator.gate().is_running() {
                tracing::debug!("improvement cycle running, skipping autonomous tick");
                continue;
            }

            if let Err(error) = self.fire_due_scheduled_items().await {
                tracing::warn!(%error, "fetching due scheduled items failed");
            }

            if let Err(error) = self.process_one_objective().await {
                tracing::warn!(%error, "project-objective processing failed");
            }
        }
    }

    async fn fire_due_scheduled_items(&self) -> Result<(), StateError> {
        let now = Utc::now();
        let due: Vec<ScheduledItem> = self.schedule.list_active_ordered().await?.into_iter().filter(|item| item.is_due(now)).collect();
        for item in due {
            self.fire_one(item).await;
        }
        Ok(())
    }

    async fn fire_one(&self, mut item: ScheduledItem) {
        match item.item_type {
            ScheduledItemType::Reminder => {
                self.orchestrator.push_reminder(item.description.clone()).await;
            }
            ScheduledItemType::Task => {
                let prompt = if item.description.trim().is_empty() { item.title.clone() } else { item.description.clone() };
                let run = self.orchestrator.run(&prompt, Intent::Autonomous);
                match tokio::time::timeout(self.config.invocation_timeout, run).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(error)) => tracing::warn!(item_id = %item.id, %error, "scheduled task run failed"),
                    Err(_) => tracing::warn!(item_id = %item.id, "scheduled task timed out"),
                }
            }
        }

        item.run_count += 1;
        item.last_run_at = Some(Utc::now());
        match compute_next_run(&item.schedule, Utc::now()) {
            Some(next) => item.next_run_at = Some(next),
            None => {
                item.status = ScheduledItemStatus::Done;
                item.next_run_at = None;
            }
        }

        if let Err(error) = self.schedule.save(&item).await {
            tracing::warn!(item_id = %item.id, %error, "failed to persist scheduled-item advance");
        }
    }

    async fn process_one_objective(&self) -> Result<(), StateError> {
        let mut candidates: Vec<Project> = self.projects.list().await?.into_iter().filter(Project::has_objective).collect();
        let Some(interval_minutes) = objective_interval_minutes(candidates.len()) else { return Ok(()) };

        candidates.sort_by_key(|p| p.last_autonomous_at.unwrap_or(DateTime::<Utc>::MIN_UTC));

        let now = Utc::now();
        let today = now.date_naive();

        let Some(mut project) = candidates.into_iter().find(|p| is_due_for_processing(p, interval_minutes, now, today, self.config.daily_cap_per_project)) else {
            return Ok(());
        };

        self.orchestrator.set_active_project(&project).await;
        let scope = Scope::Project(project.id.clone());
        let summaries = self.recent_autonomous_summaries(&scope).await;
        let prompt = build_objective_prompt(&project, &summaries);

        let run = self.orchestrator.run(&prompt, Intent::Autonomous);
        if let Err(error) = match tokio::time::timeout(self.config.invocation_timeout, run).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => {
                tracing::warn!(project = %project.slug, "objective processing timed out");
                Ok(())
            }
        } {
            tracing::warn!(project = %project.slug, %error, "objective processing run failed");
        }

        project.last_autonomous_at = Some(now);
        project.autonomous_runs_today = if project.autonomous_runs_date == Some(today) { project.autonomous_runs_today + 1 } else { 1 };
        project.autonomous_runs_date = Some(today);
        self.projects.save(&project).await
    }

    async fn recent_autonomous_summaries(&self, scope: &Scope) -> Vec<String> {
        let state = self.orchestrator.state();
        let mut keys = match state.list(scope, forge_context::conversation_log::list_prefix()).await {
            Ok(keys) => keys,
            Err(error) => {
                tracing::warn!(%error, "failed to list conversation log for objective-prompt summaries");
                return Vec::new();
            }
        };
        keys.sort();
        keys.reverse();
        keys.truncate(CONVERSATION_SCAN_LIMIT);

        let mut summaries = Vec::new();
        for key in keys {
            if summaries.len() >= RECENT_CONVERSATIONS {
                break;
            }
            let Ok(Some(value)) = state.read(scope, &key).await else { continue };
            let Ok(conversation) = serde_json::from_value::<forge_types::Conversation>(value) else { continue };
            if conversation.metadata.get("intent").and_then(|v| v.as_str()) != Some("autonomous") {
                continue;
            }
            let mut summary = format!("{} -> {}", conversation.user_msg, conversation.agent_msg);
            summary.truncate(SUMMARY_CHARS);
            summaries.push(summary);
        }
        summaries
    }
}

fn is_due_for_processing(project: &Project, interval_minutes: i64, now: DateTime<Utc>, today: NaiveDate, daily_cap: u32) -> bool {
    let interval_elapsed = match project.last_autonomous_at {
        None => true,
        Some(last) => now - last >= ChronoDuration::minutes(interval_minutes),
    };
    interval_elapsed && project.runs_remaining_today(today, daily_cap) > 0
}

fn build_objective_prompt(project: &Project, summaries: &[String]) -> String {
    let mut prompt = format!("Project: {}\nObjective: {}\n", project.name, project.objective);
    if !summaries.is_empty() {
        prompt.push_str("\nRecent autonomous activity on this project (avoid repeating it):\n");
        for summary in summaries {
            prompt.push_str("- ");
            prompt.push_str(summary);
            prompt.push('\n');
        }
    }
    prompt.push_str("\nMake concrete progress on the objective.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn project_with(objective: &str, last_autonomous_at: Option<DateTime<Utc>>) -> Project {
        let mut p = Project::new("p1", "Demo", "demo", "/tmp/demo".into(), Utc::now());
        p.objective = objective.to_string();
        p.last_autonomous_at = last_autonomous_at;
        p
    }

    #[test]
    fn objective_interval_table_matches_spec_tiers() {
        assert_eq!(objective_interval_minutes(0), None);
        assert_eq!(objective_interval_minutes(1), Some(60));
        assert_eq!(objective_interval_minutes(6), Some(60));
        assert_eq!(objective_interval_minutes(7), Some(30));
        assert_eq!(objective_interval_minutes(14), Some(30));
        assert_eq!(objective_interval_minutes(15), Some(15));
        assert_eq!(objective_interval_minutes(25), Some(15));
        assert_eq!(objective_interval_minutes(26), Some(10));
        assert_eq!(objective_interval_minutes(40), Some(10));
        assert_eq!(objective_interval_minutes(41), Some(5));
        assert_eq!(objective_interval_minutes(1000), Some(5));
    }

    #[test]
    fn never_processed_project_is_always_due() {
        let project = project_with("ship it", None);
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert!(is_due_for_processing(&project, 60, now, now.date_naive(), 4));
    }

    #[test]
    fn recently_processed_project_is_not_yet_due() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 1, 0, 0).unwrap();
        let project = project_with("ship it", Some(now - ChronoDuration::minutes(10)));
        assert!(!is_due_for_processing(&project, 60, now, now.date_naive(), 4));
    }

    #[test]
    fn daily_cap_blocks_further_processing_even_if_interval_elapsed() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 1, 0, 0).unwrap();
        let mut project = project_with("ship it", Some(now - ChronoDuration::hours(2)));
        project.autonomous_runs_today = 4;
        project.autonomous_runs_date = Some(now.date_naive());
        assert!(!is_due_for_processing(&project, 60, now, now.date_naive(), 4));
    }

    #[test]
    fn objective_prompt_includes_name_objective_and_summaries() {
        let project = project_with("ship it", None);
        let prompt = build_objective_prompt(&project, &["did X -> did Y".to_string()]);
        assert!(prompt.contains("Demo"));
        assert!(prompt.contains("ship it"));
        assert!(prompt.contains("did X -> did Y"));
    }

    #[test]
    fn objective_prompt_omits_activity_section_with_no_history() {
        let project = project_with("ship it", None);
        let prompt = build_objective_prompt(&project, &[]);
        assert!(!prompt.contains("Recent autonomous activity"));
    }
}
