//! The bounded, deduplicating error ring (spec.md §4.11).

use chrono::{DateTime, Utc};
use forge_types::ErrorRecord;
use layer0::id::ErrorRecordId;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Maximum number of distinct records retained; the oldest is evicted once
/// a new, non-duplicate record would exceed this.
const RING_SIZE: usize = 50;

/// Identical `(origin, message)` pairs within this window refresh the
/// existing record instead of inserting a new one.
const DEDUP_WINDOW_SECS: i64 = 60;

/// Only origins under this prefix are collected — everything else is
/// assumed to be a dependency's own logging, not this runtime's.
const RUNTIME_NAMESPACE_PREFIX: &str = "forge_";

/// Origins under this prefix are discarded outright: the improvement loop
/// reacting to its own errors would be a feedback loop.
const SELF_FEEDBACK_PREFIX: &str = "forge_improvement";

/// Default `max_age_minutes` for [`ErrorCollector::unresolved`].
const DEFAULT_MAX_AGE_MINUTES: i64 = 30;

fn accepts_origin(origin: &str) -> bool {
    origin.starts_with(RUNTIME_NAMESPACE_PREFIX) && !origin.starts_with(SELF_FEEDBACK_PREFIX)
}

/// A bounded, deduplicating collector of `ERROR`-level structured log
/// records. Fed by [`crate::layer::ErrorCollectorLayer`] in production and
/// directly via [`ErrorCollector::record_at`] in tests that need a fixed
/// clock.
pub struct ErrorCollector {
    records: Mutex<VecDeque<ErrorRecord>>,
    next_id: AtomicU64,
}

impl ErrorCollector {
    /// An empty collector.
    pub fn new() -> Self {
        Self { records: Mutex::new(VecDeque::new()), next_id: AtomicU64::new(0) }
    }

    fn next_id(&self) -> ErrorRecordId {
        ErrorRecordId::new(format!("err-{}", self.next_id.fetch_add(1, Ordering::Relaxed)))
    }

    /// Record one `ERROR`-level event at `now`. Filtered by namespace and
    /// self-feedback rules; deduped within [`DEDUP_WINDOW_SECS`] of the
    /// most recent occurrence of the same `(origin, message)` pair.
    pub fn record_at(&self, origin: &str, message: &str, stack_trace: Option<String>, now: DateTime<Utc>) {
        if !accepts_origin(origin) {
            return;
        }

        let dedup_key = ErrorRecord::dedup_key(origin, message);
        let mut records = self.records.lock().expect("error collector lock poisoned");

        if let Some(existing) = records.iter_mut().find(|r| {
            ErrorRecord::dedup_key(&r.origin, &r.message) == dedup_key && (now - r.timestamp).num_seconds() < DEDUP_WINDOW_SECS
        }) {
            existing.occurrence_count += 1;
            existing.timestamp = now;
            return;
        }

        if records.len() >= RING_SIZE {
            records.pop_front();
        }

        records.push_back(ErrorRecord {
            id: self.next_id(),
            timestamp: now,
            origin: origin.to_string(),
            message: message.to_string(),
            stack_trace,
            occurrence_count: 1,
            resolved: false,
        });
    }

    /// Record one `ERROR`-level event, stamped with the current time.
    pub fn record(&self, origin: &str, message: &str, stack_trace: Option<String>) {
        self.record_at(origin, message, stack_trace, Utc::now());
    }

    /// Unresolved records no older than `max_age_minutes`, relative to `now`.
    pub fn unresolved_at(&self, max_age_minutes: i64, now: DateTime<Utc>) -> Vec<ErrorRecord> {
        self.records
            .lock()
            .expect("error collector lock poisoned")
            .iter()
            .filter(|r| !r.resolved && (now - r.timestamp).num_minutes() < max_age_minutes)
            .cloned()
            .collect()
    }

    /// Unresolved records no older than `max_age_minutes`, relative to now.
    pub fn unresolved(&self, max_age_minutes: i64) -> Vec<ErrorRecord> {
        self.unresolved_at(max_age_minutes, Utc::now())
    }

    /// Whether there are unresolved errors within the default 30-minute
    /// window — the improvement loop's error-mode trigger.
    pub fn has_actionable(&self) -> bool {
        !self.unresolved(DEFAULT_MAX_AGE_MINUTES).is_empty()
    }

    /// Mark every currently held record resolved. Called by the
    /// improvement loop after a fix-mode cycle merges successfully.
    pub fn mark_all_resolved(&self) {
        for record in self.records.lock().expect("error collector lock poisoned").iter_mut() {
            record.resolved = true;
        }
    }

    /// Format unresolved records (default max age) as a multi-line block
    /// suitable for embedding in the improvement loop's fix-mode prompt:
    /// one `[id] origin (age) xN` header per record, the message, and the
    /// stack trace if captured.
    pub fn format_for_prompt(&self) -> String {
        self.format_for_prompt_at(Utc::now())
    }

    fn format_for_prompt_at(&self, now: DateTime<Utc>) -> String {
        let records = self.unresolved_at(DEFAULT_MAX_AGE_MINUTES, now);
        records
            .iter()
            .map(|r| {
                let age_secs = (now - r.timestamp).num_seconds().max(0);
                let mut block = format!("[{}] {} ({age_secs}s ago) x{}\n{}", r.id, r.origin, r.occurrence_count, r.message);
                if let Some(trace) = &r.stack_trace {
                    block.push('\n');
                    block.push_str(trace);
                }
                block
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl Default for ErrorCollector {
    fn default() -> Self {
        Self::new()
    }
}
