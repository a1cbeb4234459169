//! A named logical workspace with an optional long-running objective.

use chrono::{DateTime, NaiveDate, Utc};
use layer0::id::ProjectId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A project: a filesystem workspace plus an optional objective the
/// autonomous loop advances incrementally.
///
/// Invariants: `slug` is unique across all projects; `workspace_path`
/// exists or is creatable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique id.
    pub id: ProjectId,
    /// Human-facing display name.
    pub name: String,
    /// URL-safe slug, unique, used for `#<slug>` mentions.
    pub slug: String,
    /// Absolute filesystem workspace root.
    pub workspace_path: PathBuf,
    /// Free-text objective. Empty string means "no objective" (the
    /// autonomous loop skips projects with an empty objective when
    /// rotating, per spec.md §4.8).
    pub objective: String,
    /// When the project was created.
    pub created_at: DateTime<Utc>,
    /// Last time a user request targeted this project.
    pub last_used_at: Option<DateTime<Utc>>,
    /// Last time the autonomous loop processed this project's objective.
    pub last_autonomous_at: Option<DateTime<Utc>>,
    /// How many autonomous runs have happened today, for the per-project
    /// daily cap (default 4).
    pub autonomous_runs_today: u32,
    /// The UTC calendar date `autonomous_runs_today` is counted against;
    /// the count resets when this date is not today.
    pub autonomous_runs_date: Option<NaiveDate>,
}

impl Project {
    /// Build a new project with no objective yet.
    pub fn new(id: impl Into<ProjectId>, name: impl Into<String>, slug: impl Into<String>, workspace_path: PathBuf, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slug: slug.into(),
            workspace_path,
            objective: String::new(),
            created_at,
            last_used_at: None,
            last_autonomous_at: None,
            autonomous_runs_today: 0,
            autonomous_runs_date: None,
        }
    }

    /// True if this project has a non-empty objective (eligible for
    /// autonomous-loop rotation).
    pub fn has_objective(&self) -> bool {
        !self.objective.trim().is_empty()
    }

    /// Runs remaining today against the given daily cap, accounting for
    /// date rollover (if `autonomous_runs_date` isn't `today`, the
    /// effective count is zero).
    pub fn runs_remaining_today(&self, today: NaiveDate, daily_cap: u32) -> u32 {
        let used = if self.autonomous_runs_date == Some(today) { self.autonomous_runs_today } else { 0 };
        daily_cap.saturating_sub(used)
    }
}
