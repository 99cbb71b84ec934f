//! Work-block scheduling engine.
//!
//! Places tasks and workflow steps into typed work blocks over a multi-day
//! horizon, ordered by a composite priority score. The engine is a pure
//! in-process computation: no I/O, no global state, one deterministic pass
//! per call.

pub mod capacity;
pub mod config;
pub mod dependency;
mod interner;
pub mod logging;
pub mod models;
pub mod priority;
pub mod scheduler;
pub mod time;

pub use capacity::{capacity_for_minutes, capacity_of, CapacityAnomaly, CapacityMap, CapacityReport};
pub use config::{ScheduleOptions, SchedulingPreferences};
pub use dependency::{
    critical_path, level_of, validate_dependencies, validate_workflow, CriticalPath,
    DependencyError, StepGraph, ValidationIssue, ValidationReport,
};
pub use models::{
    BlockType, CognitiveLevel, DailyWorkPattern, DeadlineType, ItemKind, Meeting,
    ProductivityWindow, ScheduledItem, Step, StepStatus, SystemBlockKind, Task, UnscheduledItem,
    UnscheduledReason, WorkBlock, WorkTypeSplit, Workflow,
};
pub use priority::{priority, Priority, PriorityBreakdown, PriorityItem, SchedulingContext};
pub use scheduler::{
    BlockUtilization, DebugInfo, ScheduleMetrics, ScheduleResult, Scheduler, SchedulingDecision,
};

/// Schedule `tasks` and the steps of `workflows` into the blocks of `patterns`.
///
/// Never fails: bad input is absorbed with defaults and reported in
/// `debug_info.warnings`, and work that does not fit is listed in
/// `unscheduled` with a reason.
pub fn schedule(
    tasks: &[Task],
    workflows: &[Workflow],
    patterns: &[DailyWorkPattern],
    options: &ScheduleOptions,
) -> ScheduleResult {
    Scheduler::new(tasks, workflows, patterns, options).schedule()
}
