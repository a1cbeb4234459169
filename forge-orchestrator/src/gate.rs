//! Mutual exclusion between a user request and a running improvement cycle
//! (spec.md §4.6 step 1, §4.9): a single process-wide flag the improvement
//! loop holds for the duration of one cycle, and the orchestrator polls
//! before dispatching a user-intent request.

use std::sync::atomic::{AtomicBool, Ordering};

/// Tracks whether an improvement cycle currently holds the workspace.
pub struct ImprovementGate {
    running: AtomicBool,
}

impl ImprovementGate {
    /// A gate with no cycle running.
    pub fn new() -> Self {
        Self { running: AtomicBool::new(false) }
    }

    /// Whether a cycle currently holds the gate.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Attempt to acquire the gate. Returns `false` if already held — the
    /// improvement loop treats that as "not our turn yet" rather than an
    /// error, since the gate-check cadence will simply try again later.
    pub fn acquire(&self) -> bool {
        self.running.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
    }

    /// Release the gate. Idempotent.
    pub fn release(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Default for ImprovementGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_released() {
        let gate = ImprovementGate::new();
        assert!(gate.acquire());
        assert!(!gate.acquire());
        gate.release();
        assert!(gate.acquire());
    }
}
