//! Time-based scheduled work: one-off/recurring tasks and reminders.
//!
//! The recurrence algebra itself (validation, `compute_next_run`,
//! `next_aligned_tick`) lives in `forge-scheduler`, which is pure and
//! depends only on this module's [`RecurrenceSpec`] for its input shape.

use chrono::{DateTime, Utc};
use layer0::id::ScheduledItemId;
use serde::{Deserialize, Serialize};

/// What kind of scheduled item this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledItemType {
    /// Invoked through `Orchestrator::run(intent = autonomous)` when due.
    Task,
    /// Pushed onto the orchestrator's pending-reminders queue when due;
    /// the CLI drains the queue before each prompt.
    Reminder,
}

/// Lifecycle state of a [`ScheduledItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledItemStatus {
    /// Eligible to fire; `next_run_at` is present.
    Active,
    /// Temporarily suspended via `/schedule pause`; `next_run_at` is cleared.
    Paused,
    /// Recurrence is exhausted (e.g. a `once` whose `at` has passed after
    /// firing) or cancelled by an explicit terminal action.
    Done,
    /// Cancelled via `/schedule cancel` before it could fire.
    Cancelled,
}

/// A recurrence specification, tagged by `type`. Exactly the shape
/// spec.md §4.7 and §6 describe; round-trips through JSON for the
/// `scheduled_items.schedule_json` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurrenceSpec {
    /// Fires exactly once at `at`, then the item transitions to `Done`.
    Once {
        /// The instant to fire at.
        at: DateTime<Utc>,
    },
    /// Fires every `minutes` starting from the `after` timestamp passed to
    /// `compute_next_run`.
    Interval {
        /// Minutes between firings. Must be `> 0`.
        minutes: u32,
    },
    /// Fires once a day at a fixed UTC time.
    Daily {
        /// `"HH:MM"` 24-hour UTC.
        time: String,
    },
    /// Fires once a week on a fixed weekday at a fixed UTC time.
    Weekly {
        /// `"HH:MM"` 24-hour UTC.
        time: String,
        /// Lowercase English weekday name.
        day: String,
    },
    /// Fires once a month on a fixed day-of-month at a fixed UTC time.
    Monthly {
        /// `"HH:MM"` 24-hour UTC.
        time: String,
        /// Day of month, restricted to `[1, 28]` to avoid month-length
        /// anomalies.
        day_of_month: u8,
    },
}

/// A piece of time-based scheduled work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledItem {
    /// Unique id.
    pub id: ScheduledItemId,
    /// Task or reminder.
    pub item_type: ScheduledItemType,
    /// Short title.
    pub title: String,
    /// Full description (the task prompt, or the reminder text).
    pub description: String,
    /// The recurrence rule.
    pub schedule: RecurrenceSpec,
    /// Current lifecycle state.
    pub status: ScheduledItemStatus,
    /// Present iff `status == Active`.
    pub next_run_at: Option<DateTime<Utc>>,
    /// Timestamp of the most recent firing, if any.
    pub last_run_at: Option<DateTime<Utc>>,
    /// How many times this item has fired.
    pub run_count: u64,
    /// When this item was created.
    pub created_at: DateTime<Utc>,
}

impl ScheduledItem {
    /// Build a new active scheduled item with the given initial
    /// `next_run_at` (the caller computes this via `forge-scheduler`).
    pub fn new(
        id: impl Into<ScheduledItemId>,
        item_type: ScheduledItemType,
        title: impl Into<String>,
        description: impl Into<String>,
        schedule: RecurrenceSpec,
        next_run_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let status = if next_run_at.is_some() { ScheduledItemStatus::Active } else { ScheduledItemStatus::Done };
        Self {
            id: id.into(),
            item_type,
            title: title.into(),
            description: description.into(),
            schedule,
            status,
            next_run_at,
            last_run_at: None,
            run_count: 0,
            created_at,
        }
    }

    /// True if this item is due to fire at or before `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ScheduledItemStatus::Active && self.next_run_at.is_some_and(|t| t <= now)
    }
}
