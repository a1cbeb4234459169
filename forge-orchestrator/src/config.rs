//! Every tunable spec.md names as a default, gathered into one
//! structured configuration (SPEC_FULL.md §3 `[EXPANSION] RuntimeConfig`)
//! rather than scattered module-level constants — the orchestrator is the
//! component that wires up both background loops, so it owns the values
//! they're built with.

/// The full set of tunables a deployment might override. `Default`
/// reproduces every value spec.md calls out by name.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Agent loop's provider round-trip ceiling (spec.md §4.3).
    pub agent_max_iterations: u32,
    /// Plan executor's bounded-parallelism cap (spec.md §9 Open Questions).
    pub executor_max_parallelism: usize,
    /// Sampling temperature for direct-mode and synthesis agent calls.
    pub agent_temperature: f32,
    /// How many seconds the orchestrator waits, polling once per second,
    /// for a running improvement cycle to finish before a user request
    /// proceeds (spec.md §4.6 step 1).
    pub improvement_wait_seconds: u64,
    /// Minimum minutes between improvement cycles (spec.md §4.9).
    pub improvement_interval_minutes: i64,
    /// Maximum improvement cycles started within any rolling hour.
    pub improvement_max_cycles_per_hour: u32,
    /// Token budget consumed by improvement cycles within any rolling hour.
    pub improvement_token_budget_per_hour: u64,
    /// Minutes of user inactivity required before an improvement cycle may
    /// run, unless the error-mode bypass applies.
    pub improvement_idle_minutes_before_run: i64,
    /// Consecutive no-improvement cycles before rotation mode kicks in.
    pub improvement_rotation_threshold: u32,
    /// Autonomous loop's tick alignment, in minutes (spec.md §4.8).
    pub autonomous_tick_minutes: u32,
    /// Per-project daily cap on autonomous objective processing.
    pub autonomous_daily_cap_per_project: u32,
    /// Deadline applied to every agent-run, improvement-cycle, and
    /// scheduled-task invocation (spec.md §5).
    pub invocation_timeout_secs: u64,
    /// Error collector ring size (spec.md §4.11).
    pub error_ring_size: usize,
    /// Error collector dedup window, in seconds.
    pub error_dedup_window_secs: i64,
    /// Input length, in characters, at or below which direct mode is still
    /// eligible (spec.md §4.6 step 4).
    pub direct_mode_max_chars: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            agent_max_iterations: 20,
            executor_max_parallelism: 5,
            agent_temperature: 0.7,
            improvement_wait_seconds: 30,
            improvement_interval_minutes: 360,
            improvement_max_cycles_per_hour: 1,
            improvement_token_budget_per_hour: 80_000,
            improvement_idle_minutes_before_run: 5,
            improvement_rotation_threshold: 20,
            autonomous_tick_minutes: 5,
            autonomous_daily_cap_per_project: 4,
            invocation_timeout_secs: 300,
            error_ring_size: 50,
            error_dedup_window_secs: 60,
            direct_mode_max_chars: 500,
        }
    }
}
