//! Concrete [`layer0::state::StateStore`] backends plus the narrow,
//! table-shaped traits the rest of the runtime actually programs
//! against (`ProjectStore`, `ScheduleStore`, `ImprovementStore`,
//! `TaskStore`). The backends are general-purpose key/value stores; the
//! table-shaped traits on top of them build on `forge-context`'s
//! key-prefix and timestamp-ordering conventions, standing in for what
//! a real SQL-backed store (spec.md §6) would provide with actual
//! indices and queries.
#![deny(missing_docs)]

pub mod fs;
pub mod improvement;
pub mod memory;
pub mod project;
pub mod schedule;
pub mod task_log;

pub use fs::FsStore;
pub use improvement::{ImprovementStore, KvImprovementStore};
pub use memory::MemoryStore;
pub use project::{KvProjectStore, ProjectStore};
pub use schedule::{KvScheduleStore, ScheduleStore};
pub use task_log::{KvTaskStore, TaskRecord, TaskStore};
